//! The reload controller and its timer lifecycle.
//!
//! A controller re-runs a load function on a timer. After every successful
//! load it resolves the next delay from its [`IntervalPolicy`], stretching it
//! when the load itself took longer than the interval. A failed load is logged
//! and ends the polling loop until the next manual [`ReloadController::reload`].
//!
//! State transitions happen under a short-lived lock that is never held while
//! awaiting or while calling into user code. Load continuations run on the
//! runtime captured at build time, so a reload started by a caller that drops
//! the returned future still completes and re-arms the timer.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use gsa_settings::SharedSettings;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{ConfigError, LoadError, Result};
use crate::handle::ReloadHandle;
use crate::interval::{
    next_delay, DefaultOverrides, IntervalPolicy, IntervalSelector, ReloadInterval, NO_RELOAD,
};
use crate::stats::{Counters, ReloadStats};

/// Deferred result of a single load function call
pub type LoadFuture = BoxFuture<'static, std::result::Result<(), LoadError>>;

/// Type-erased load function. Receives the options passed to `reload`, or
/// `None` for the initial and timer-driven loads.
pub type LoadFn<O> = Arc<dyn Fn(Option<O>) -> LoadFuture + Send + Sync>;

/// Completes when a load cycle has settled. Never fails.
pub type ReloadFuture = BoxFuture<'static, ()>;

/// The armed timer: an id to detect stale wake-ups and the task to abort
struct Timer {
    id: u64,
    task: AbortHandle,
}

struct ControllerState {
    running: bool,
    /// Bumped on every start and stop; completions from an older epoch are discarded
    epoch: u64,
    visible: bool,
    timer: Option<Timer>,
    measurement_start: Option<Instant>,
    next_timer_id: u64,
    counters: Counters,
}

impl ControllerState {
    fn new(visible: bool) -> Self {
        Self {
            running: false,
            epoch: 0,
            visible,
            timer: None,
            measurement_start: None,
            next_timer_id: 1,
            counters: Counters::default(),
        }
    }

    /// Elapsed time since the last measurement start, zero without one
    fn end_measurement(&mut self) -> Duration {
        self.measurement_start
            .take()
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }
}

pub(crate) struct Inner<O> {
    name: String,
    load: LoadFn<O>,
    reload: LoadFn<O>,
    policy: IntervalPolicy,
    runtime: Handle,
    state: Mutex<ControllerState>,
}

impl<O> Inner<O> {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        let mut state = self.state.lock();
        if state.visible != visible {
            debug!(name = %self.name, visible, "Visibility changed");
            state.visible = visible;
        }
    }

    pub(crate) fn has_timer(&self) -> bool {
        self.state.lock().timer.is_some()
    }

    pub(crate) fn stats(&self) -> ReloadStats {
        let state = self.state.lock();
        ReloadStats::new(
            &self.name,
            state.running,
            state.visible,
            state.timer.is_some(),
            state.counters,
        )
    }

    pub(crate) fn stop(&self) {
        let mut state = self.state.lock();
        if state.running {
            debug!(name = %self.name, "Stopping reload controller");
        }
        state.running = false;
        state.epoch += 1;
        state.measurement_start = None;
        self.clear_timer(&mut state);
    }

    fn clear_timer(&self, state: &mut ControllerState) {
        if let Some(timer) = state.timer.take() {
            debug!(name = %self.name, timer_id = timer.id, "Clearing reload timer");
            timer.task.abort();
            state.counters.timers_cancelled += 1;
        }
    }
}

impl<O: Send + 'static> Inner<O> {
    fn start(self: &Arc<Self>) -> ReloadFuture {
        {
            let mut state = self.state.lock();
            if state.running {
                debug!(name = %self.name, "Reload controller already running");
                return future::ready(()).boxed();
            }
            state.running = true;
            state.epoch += 1;
        }

        debug!(name = %self.name, "Initial loading");
        self.begin_cycle(&self.load, None)
    }

    pub(crate) fn reload(self: &Arc<Self>, options: Option<O>) -> ReloadFuture {
        if !self.is_running() {
            debug!(name = %self.name, "Ignoring reload request, controller is not running");
            return future::ready(()).boxed();
        }

        debug!(name = %self.name, with_options = options.is_some(), "Reloading requested");
        self.begin_cycle(&self.reload, options)
    }

    /// Run one load cycle.
    ///
    /// The pending timer is cancelled and the load function is called before
    /// this returns. Completion handling is spawned so it runs whether or not
    /// the returned future is polled.
    fn begin_cycle(self: &Arc<Self>, load: &LoadFn<O>, options: Option<O>) -> ReloadFuture {
        let epoch = {
            let mut state = self.state.lock();
            self.clear_timer(&mut state);

            if !state.running {
                return future::ready(()).boxed();
            }

            state.measurement_start = Some(Instant::now());
            state.counters.loads_started += 1;
            state.epoch
        };

        debug!(name = %self.name, epoch, "Loading requested");
        let pending = load(options);

        let inner = Arc::clone(self);
        let completion = self.runtime.spawn(async move {
            match pending.await {
                Ok(()) => inner.on_load_succeeded(epoch),
                Err(error) => inner.on_load_failed(epoch, &error),
            }
        });

        let name = self.name.clone();
        async move {
            if let Err(error) = completion.await {
                debug!(name = %name, %error, "Load task ended abnormally");
            }
        }
        .boxed()
    }

    fn on_load_succeeded(self: &Arc<Self>, epoch: u64) {
        debug!(name = %self.name, "Loading finished");
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                debug!(
                    name = %self.name,
                    epoch,
                    current_epoch = state.epoch,
                    "Load settled after stop, discarding result"
                );
                return;
            }
            state.counters.loads_succeeded += 1;
        }
        self.start_timer(epoch);
    }

    fn on_load_failed(&self, epoch: u64, error: &LoadError) {
        let mut state = self.state.lock();
        if state.epoch == epoch {
            state.counters.loads_failed += 1;
        }
        debug!(
            name = %self.name,
            %error,
            "Loading has been rejected. Not starting new timer"
        );
    }

    fn start_timer(self: &Arc<Self>, epoch: u64) {
        let (load_time, visible) = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            if !state.running || state.timer.is_some() {
                debug!(
                    name = %self.name,
                    running = state.running,
                    timer_id = ?state.timer.as_ref().map(|t| t.id),
                    "Not starting timer. A timer is already running"
                );
                return;
            }

            let load_time = state.end_measurement();
            state.counters.last_load_time = Some(load_time);
            (load_time, state.visible)
        };

        debug!(name = %self.name, load_time_ms = load_time.as_millis() as u64, "Loading time measured");

        // The selector is user code; resolve without holding the lock.
        let interval = next_delay(self.policy.resolve(visible), load_time);

        if interval == NO_RELOAD {
            debug!(name = %self.name, "Not starting timer. Reload is disabled");
            return;
        }

        let mut state = self.state.lock();
        if state.epoch != epoch || !state.running || state.timer.is_some() {
            return;
        }

        let id = state.next_timer_id;
        state.next_timer_id += 1;

        let weak = Arc::downgrade(self);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(cycle) = Self::fire_timer(&weak, id) {
                cycle.await;
            }
        });

        state.timer = Some(Timer {
            id,
            task: task.abort_handle(),
        });
        state.counters.timers_armed += 1;
        state.counters.last_interval = Some(interval);

        debug!(
            name = %self.name,
            timer_id = id,
            interval_ms = interval.as_millis() as u64,
            "Started reload timer"
        );
    }

    /// Timer elapsed. Returns the reload cycle to drive, or `None` when the
    /// timer was cancelled or replaced in the meantime.
    fn fire_timer(weak: &Weak<Self>, id: u64) -> Option<ReloadFuture> {
        let inner = weak.upgrade()?;
        {
            let mut state = inner.state.lock();
            if state.timer.as_ref().map(|t| t.id) != Some(id) {
                debug!(name = %inner.name, timer_id = id, "Ignoring stale reload timer");
                return None;
            }
            state.timer = None;
            state.counters.timers_fired += 1;
        }

        debug!(name = %inner.name, timer_id = id, "Timer finished. Reloading data");
        Some(inner.begin_cycle(&inner.reload, None))
    }
}

/// Adaptive polling controller.
///
/// Runs the configured load function once on [`start`](Self::start) and then
/// keeps reloading on a timer until [`stop`](Self::stop) is called or the
/// controller is dropped.
///
/// `O` is the type of the opaque options passed through [`reload`](Self::reload).
pub struct ReloadController<O = ()> {
    inner: Arc<Inner<O>>,
}

impl<O: Send + 'static> ReloadController<O> {
    /// Start configuring a controller; `name` only shows up in logs
    pub fn builder(name: impl Into<String>) -> ReloadBuilder<O> {
        ReloadBuilder::new(name)
    }

    /// Attach: mark the controller running and perform the initial load.
    ///
    /// Starting a running controller does nothing. A stopped controller can
    /// be started again.
    pub fn start(&self) -> ReloadFuture {
        self.inner.start()
    }

    /// Cancel any pending timer and load again right away with `options`.
    ///
    /// Does nothing unless the controller is running. A load that is already
    /// in flight is not cancelled or awaited.
    pub fn reload(&self, options: Option<O>) -> ReloadFuture {
        self.inner.reload(options)
    }

    /// The reload capability handed to consumers
    pub fn handle(&self) -> ReloadHandle<O> {
        ReloadHandle::new(Arc::clone(&self.inner))
    }
}

impl<O> ReloadController<O> {
    /// Detach: stop polling and release the pending timer
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.is_visible()
    }

    /// Takes effect the next time an interval is resolved
    pub fn set_visible(&self, visible: bool) {
        self.inner.set_visible(visible);
    }

    pub fn has_timer(&self) -> bool {
        self.inner.has_timer()
    }

    pub fn stats(&self) -> ReloadStats {
        self.inner.stats()
    }
}

impl<O> Drop for ReloadController<O> {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

impl<O> std::fmt::Debug for ReloadController<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadController")
            .field("name", &self.inner.name)
            .field("policy", &self.inner.policy)
            .finish()
    }
}

/// Builder for [`ReloadController`]
pub struct ReloadBuilder<O> {
    name: String,
    load: Option<LoadFn<O>>,
    reload: Option<LoadFn<O>>,
    selector: Option<IntervalSelector>,
    overrides: DefaultOverrides,
    settings: Option<SharedSettings>,
    visible: bool,
}

impl<O: Send + 'static> ReloadBuilder<O> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            load: None,
            reload: None,
            selector: None,
            overrides: DefaultOverrides::default(),
            settings: None,
            visible: true,
        }
    }

    /// Load function for manual and timer-driven reloads (required)
    pub fn reload<F, Fut>(mut self, reload: F) -> Self
    where
        F: Fn(Option<O>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), LoadError>> + Send + 'static,
    {
        self.reload = Some(erase(reload));
        self
    }

    /// Load function for the initial load; defaults to the reload function
    pub fn load<F, Fut>(mut self, load: F) -> Self
    where
        F: Fn(Option<O>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), LoadError>> + Send + 'static,
    {
        self.load = Some(erase(load));
        self
    }

    /// Interval selector evaluated every time a timer is armed
    pub fn reload_interval<F>(mut self, select: F) -> Self
    where
        F: Fn() -> ReloadInterval + Send + Sync + 'static,
    {
        self.selector = Some(Arc::new(select));
        self
    }

    /// Use an already shared selector, e.g. one built by [`crate::active_while`]
    pub fn interval_selector(mut self, selector: IntervalSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn default_reload_interval(mut self, interval: Duration) -> Self {
        self.overrides.reload_interval = Some(interval);
        self
    }

    pub fn default_reload_interval_active(mut self, interval: Duration) -> Self {
        self.overrides.reload_interval_active = Some(interval);
        self
    }

    pub fn default_reload_interval_inactive(mut self, interval: Duration) -> Self {
        self.overrides.reload_interval_inactive = Some(interval);
        self
    }

    /// Settings to read defaults from; the process-wide settings otherwise
    pub fn settings(mut self, settings: SharedSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Initial visibility, `true` unless set
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Validate and build. Must be called from within a tokio runtime.
    pub fn build(self) -> Result<ReloadController<O>> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }

        let reload = self.reload.ok_or_else(|| ConfigError::MissingReload {
            name: self.name.clone(),
        })?;
        let load = self.load.unwrap_or_else(|| Arc::clone(&reload));

        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime {
            name: self.name.clone(),
        })?;

        let settings = self
            .settings
            .unwrap_or_else(|| SharedSettings::global().clone());
        let policy = IntervalPolicy::new(self.selector, self.overrides, settings);

        debug!(name = %self.name, ?policy, "Built reload controller");

        Ok(ReloadController {
            inner: Arc::new(Inner {
                name: self.name,
                load,
                reload,
                policy,
                runtime,
                state: Mutex::new(ControllerState::new(self.visible)),
            }),
        })
    }
}

fn erase<O, F, Fut>(f: F) -> LoadFn<O>
where
    F: Fn(Option<O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), LoadError>> + Send + 'static,
{
    Arc::new(move |options| f(options).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsa_settings::ReloadSettings;

    fn quiet_settings() -> SharedSettings {
        SharedSettings::new(ReloadSettings {
            reload_interval: Duration::from_millis(100),
            reload_interval_active: Duration::from_millis(10),
            reload_interval_inactive: Duration::from_millis(1_000),
        })
    }

    #[test]
    fn test_build_requires_runtime() {
        let result = ReloadController::<()>::builder("outside")
            .reload(|_| async { Ok(()) })
            .build();

        assert!(matches!(result, Err(ConfigError::NoRuntime { .. })));
    }

    #[tokio::test]
    async fn test_build_requires_name() {
        let result = ReloadController::<()>::builder("  ")
            .reload(|_| async { Ok(()) })
            .build();

        assert!(matches!(result, Err(ConfigError::MissingName)));
    }

    #[tokio::test]
    async fn test_build_requires_reload() {
        let result = ReloadController::<()>::builder("tasks")
            .load(|_| async { Ok(()) })
            .build();

        match result {
            Err(ConfigError::MissingReload { name }) => assert_eq!(name, "tasks"),
            other => panic!("Expected MissingReload, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_fresh_controller_is_idle() {
        let controller = ReloadController::<()>::builder("tasks")
            .reload(|_| async { Ok(()) })
            .settings(quiet_settings())
            .build()
            .unwrap();

        assert_eq!(controller.name(), "tasks");
        assert!(!controller.is_running());
        assert!(controller.is_visible());
        assert!(!controller.has_timer());
        assert_eq!(controller.stats().loads_started, 0);
    }

    #[tokio::test]
    async fn test_initial_visibility_from_builder() {
        let controller = ReloadController::<()>::builder("tasks")
            .reload(|_| async { Ok(()) })
            .settings(quiet_settings())
            .visible(false)
            .build()
            .unwrap();

        assert!(!controller.is_visible());
        controller.set_visible(true);
        assert!(controller.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let controller = ReloadController::<()>::builder("tasks")
            .reload(|_| async { Ok(()) })
            .settings(quiet_settings())
            .build()
            .unwrap();

        controller.start().await;
        assert!(controller.has_timer());

        controller.stop();
        controller.stop();
        assert!(!controller.is_running());
        assert!(!controller.has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_loads_once() {
        let controller = ReloadController::<()>::builder("tasks")
            .reload(|_| async { Ok(()) })
            .settings(quiet_settings())
            .build()
            .unwrap();

        controller.start().await;
        controller.start().await;

        assert_eq!(controller.stats().loads_started, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_load_ends_cycle_without_timer() {
        let controller = ReloadController::<()>::builder("tasks")
            .reload(|_| async {
                if true {
                    panic!("loader exploded");
                }
                Ok(())
            })
            .settings(quiet_settings())
            .build()
            .unwrap();

        // The cycle future resolves even though the load task panicked
        controller.start().await;

        let stats = controller.stats();
        assert!(controller.is_running());
        assert!(!controller.has_timer());
        assert_eq!(stats.loads_started, 1);
        assert_eq!(stats.loads_succeeded, 0);
        assert_eq!(stats.loads_failed, 0);
    }
}
