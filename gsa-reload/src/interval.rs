//! Reload interval selection.
//!
//! A view can pin its own interval, ask for one of the configured defaults, or
//! switch polling off. [`IntervalPolicy`] turns that request plus the current
//! visibility into the concrete delay before the next load.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use gsa_settings::SharedSettings;

/// Resolved interval meaning "do not arm a timer"
pub const NO_RELOAD: Duration = Duration::ZERO;

/// Multiplier applied to a load time that exceeded the resolved interval.
///
/// [`next_delay`] applies it as the exact ratio
/// `LOAD_TIME_FACTOR_NUMERATOR / LOAD_TIME_FACTOR_DENOMINATOR`.
pub const LOAD_TIME_FACTOR: f64 = 1.2;

/// Numerator of [`LOAD_TIME_FACTOR`]
pub const LOAD_TIME_FACTOR_NUMERATOR: u32 = 6;
/// Denominator of [`LOAD_TIME_FACTOR`]
pub const LOAD_TIME_FACTOR_DENOMINATOR: u32 = 5;

/// Raw code for [`ReloadInterval::NoReload`]
pub const NO_RELOAD_CODE: i64 = 0;
/// Raw code for [`ReloadInterval::UseDefault`]
pub const USE_DEFAULT_RELOAD_INTERVAL: i64 = -1;
/// Raw code for [`ReloadInterval::UseDefaultActive`]
pub const USE_DEFAULT_RELOAD_INTERVAL_ACTIVE: i64 = -2;
/// Raw code for [`ReloadInterval::UseDefaultInactive`]
pub const USE_DEFAULT_RELOAD_INTERVAL_INACTIVE: i64 = -3;

/// What a view asks for when the controller needs its next delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReloadInterval {
    /// Stop polling after the current load
    NoReload,
    /// The plain default, or the inactive default while hidden
    #[default]
    UseDefault,
    /// The active default, or the inactive default while hidden
    UseDefaultActive,
    /// Always the inactive default
    UseDefaultInactive,
    /// A fixed interval
    Every(Duration),
}

impl ReloadInterval {
    /// Decode a raw millisecond value that may carry one of the sentinel codes.
    ///
    /// Unknown negative values fall back to [`ReloadInterval::UseDefault`].
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            NO_RELOAD_CODE => Self::NoReload,
            USE_DEFAULT_RELOAD_INTERVAL_ACTIVE => Self::UseDefaultActive,
            USE_DEFAULT_RELOAD_INTERVAL_INACTIVE => Self::UseDefaultInactive,
            m if m < 0 => Self::UseDefault,
            m => Self::Every(Duration::from_millis(m as u64)),
        }
    }

    /// Encode back into the raw millisecond form
    pub fn as_millis(&self) -> i64 {
        match self {
            Self::NoReload => NO_RELOAD_CODE,
            Self::UseDefault => USE_DEFAULT_RELOAD_INTERVAL,
            Self::UseDefaultActive => USE_DEFAULT_RELOAD_INTERVAL_ACTIVE,
            Self::UseDefaultInactive => USE_DEFAULT_RELOAD_INTERVAL_INACTIVE,
            Self::Every(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

impl From<Duration> for ReloadInterval {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::NoReload
        } else {
            Self::Every(duration)
        }
    }
}

/// Caller-supplied interval selector, evaluated on every timer arm
pub type IntervalSelector = Arc<dyn Fn() -> ReloadInterval + Send + Sync>;

/// Selector asking for the active default while `is_active` holds.
///
/// List views use this to poll quickly while one of the listed entities is
/// still running and fall back to the normal cadence once everything settled.
pub fn active_while<F>(is_active: F) -> IntervalSelector
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    Arc::new(move || {
        if is_active() {
            ReloadInterval::UseDefaultActive
        } else {
            ReloadInterval::UseDefault
        }
    })
}

/// Explicit per-controller overrides of the settings defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultOverrides {
    pub reload_interval: Option<Duration>,
    pub reload_interval_active: Option<Duration>,
    pub reload_interval_inactive: Option<Duration>,
}

/// Resolves the next reload delay.
///
/// Defaults come from the explicit overrides if present and from the live
/// settings otherwise. Settings are read on every call.
#[derive(Clone)]
pub struct IntervalPolicy {
    selector: Option<IntervalSelector>,
    overrides: DefaultOverrides,
    settings: SharedSettings,
}

impl IntervalPolicy {
    pub fn new(
        selector: Option<IntervalSelector>,
        overrides: DefaultOverrides,
        settings: SharedSettings,
    ) -> Self {
        Self {
            selector,
            overrides,
            settings,
        }
    }

    /// Policy with no selector and no overrides
    pub fn from_settings(settings: SharedSettings) -> Self {
        Self::new(None, DefaultOverrides::default(), settings)
    }

    pub fn default_reload_interval(&self) -> Duration {
        self.overrides
            .reload_interval
            .unwrap_or_else(|| self.settings.reload_interval())
    }

    pub fn default_reload_interval_active(&self) -> Duration {
        self.overrides
            .reload_interval_active
            .unwrap_or_else(|| self.settings.reload_interval_active())
    }

    pub fn default_reload_interval_inactive(&self) -> Duration {
        self.overrides
            .reload_interval_inactive
            .unwrap_or_else(|| self.settings.reload_interval_inactive())
    }

    /// What the selector currently asks for (`UseDefault` without a selector)
    pub fn requested(&self) -> ReloadInterval {
        self.selector
            .as_ref()
            .map(|select| select())
            .unwrap_or_default()
    }

    /// The interval to wait before the next load, [`NO_RELOAD`] to stop
    pub fn resolve(&self, visible: bool) -> Duration {
        match self.requested() {
            ReloadInterval::UseDefaultActive => {
                if visible {
                    self.default_reload_interval_active()
                } else {
                    self.default_reload_interval_inactive()
                }
            }
            ReloadInterval::UseDefaultInactive => self.default_reload_interval_inactive(),
            ReloadInterval::UseDefault => {
                if visible {
                    self.default_reload_interval()
                } else {
                    self.default_reload_interval_inactive()
                }
            }
            ReloadInterval::NoReload => NO_RELOAD,
            ReloadInterval::Every(interval) => interval,
        }
    }
}

impl fmt::Debug for IntervalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalPolicy")
            .field("selector", &self.selector.as_ref().map(|_| "<fn>"))
            .field("overrides", &self.overrides)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Final timer delay after accounting for how long the last load took.
///
/// A load slower than the interval pushes the next timer out to
/// `load_time * LOAD_TIME_FACTOR`, so the next load never starts before the
/// previous one would realistically have finished.
pub fn next_delay(interval: Duration, load_time: Duration) -> Duration {
    if load_time > interval && interval > NO_RELOAD {
        stretch(load_time)
    } else {
        interval
    }
}

// Integer nanoseconds, exact for whole milliseconds.
fn stretch(load_time: Duration) -> Duration {
    load_time
        .checked_mul(LOAD_TIME_FACTOR_NUMERATOR)
        .map(|d| d / LOAD_TIME_FACTOR_DENOMINATOR)
        .unwrap_or(Duration::MAX)
}
