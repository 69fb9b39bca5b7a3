//! Test helpers for driving reload controllers on a paused clock.
//!
//! - `SpyLoader`: a load function that records every call and its options, and
//!   notices when two calls from the same run are in flight at once
//! - `test_settings`: small, distinct intervals so assertions can tell them apart
//! - `settle`: let spawned completions run without advancing the clock

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use gsa_reload::{LoadError, ReloadSettings, SharedSettings};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
pub const ACTIVE_INTERVAL: Duration = Duration::from_millis(20);
pub const INACTIVE_INTERVAL: Duration = Duration::from_millis(1_000);

/// Settings with the test intervals above
pub fn test_settings() -> SharedSettings {
    SharedSettings::new(ReloadSettings {
        reload_interval: DEFAULT_INTERVAL,
        reload_interval_active: ACTIVE_INTERVAL,
        reload_interval_inactive: INACTIVE_INTERVAL,
    })
}

/// Yield enough times for spawned load completions to run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// How the next loads behave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    Fail,
    /// Sleep on the (paused) clock, then succeed
    Slow(Duration),
    /// Wait until the test calls `SpyLoader::release`, then succeed
    Gated,
}

/// A load function that records its calls
#[derive(Clone)]
pub struct SpyLoader<O> {
    calls: Arc<Mutex<Vec<Option<O>>>>,
    behaviour: Arc<Mutex<Behaviour>>,
    gate: Arc<Semaphore>,
    run: Arc<AtomicU64>,
    in_flight: Arc<Mutex<HashMap<u64, usize>>>,
    overlaps: Arc<AtomicUsize>,
}

impl<O: Clone + Send + 'static> SpyLoader<O> {
    pub fn new() -> Self {
        Self::with_behaviour(Behaviour::Succeed)
    }

    pub fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            behaviour: Arc::new(Mutex::new(behaviour)),
            gate: Arc::new(Semaphore::new(0)),
            run: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            overlaps: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Tag later calls as belonging to a new controller run
    pub fn begin_run(&self) {
        self.run.fetch_add(1, Ordering::SeqCst);
    }

    /// Calls that started while another call from the same run was in flight
    pub fn overlapping_calls(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock() = behaviour;
    }

    /// Let `n` gated loads finish
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn options(&self) -> Vec<Option<O>> {
        self.calls.lock().clone()
    }

    pub fn last_options(&self) -> Option<Option<O>> {
        self.calls.lock().last().cloned()
    }

    /// The function to hand to the controller builder
    pub fn load_fn(
        &self,
    ) -> impl Fn(Option<O>) -> BoxFuture<'static, Result<(), LoadError>> + Send + Sync + 'static
    {
        let calls = Arc::clone(&self.calls);
        let behaviour = Arc::clone(&self.behaviour);
        let gate = Arc::clone(&self.gate);
        let run = Arc::clone(&self.run);
        let in_flight = Arc::clone(&self.in_flight);
        let overlaps = Arc::clone(&self.overlaps);

        move |options| {
            calls.lock().push(options);
            let behaviour = *behaviour.lock();
            let gate = Arc::clone(&gate);

            let run = run.load(Ordering::SeqCst);
            {
                let mut in_flight = in_flight.lock();
                let count = in_flight.entry(run).or_insert(0);
                if *count > 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                *count += 1;
            }
            let in_flight = Arc::clone(&in_flight);

            async move {
                let result = match behaviour {
                    Behaviour::Succeed => Ok(()),
                    Behaviour::Fail => Err(LoadError::msg("backend unavailable")),
                    Behaviour::Slow(duration) => {
                        tokio::time::sleep(duration).await;
                        Ok(())
                    }
                    Behaviour::Gated => gate
                        .acquire()
                        .await
                        .map(|permit| permit.forget())
                        .map_err(LoadError::new),
                };

                if let Some(count) = in_flight.lock().get_mut(&run) {
                    *count -= 1;
                }
                result
            }
            .boxed()
        }
    }
}
