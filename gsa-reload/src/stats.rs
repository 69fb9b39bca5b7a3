//! Diagnostic counters for a reload controller.

use std::fmt;
use std::time::Duration;

/// Running totals kept alongside the controller state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Counters {
    pub loads_started: u64,
    pub loads_succeeded: u64,
    pub loads_failed: u64,
    pub timers_armed: u64,
    pub timers_fired: u64,
    pub timers_cancelled: u64,
    pub last_interval: Option<Duration>,
    pub last_load_time: Option<Duration>,
}

/// Point-in-time view of a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadStats {
    pub name: String,
    pub is_running: bool,
    pub is_visible: bool,
    pub timer_pending: bool,
    /// Load functions invoked, whether by start, timer or manual reload
    pub loads_started: u64,
    /// Loads that finished successfully while the controller was running
    pub loads_succeeded: u64,
    /// Loads that failed while the controller was running
    pub loads_failed: u64,
    pub timers_armed: u64,
    pub timers_fired: u64,
    /// Timers cleared before they fired, by a reload or by stop
    pub timers_cancelled: u64,
    /// Delay of the most recently armed timer
    pub last_interval: Option<Duration>,
    /// Measured duration of the most recent successful load
    pub last_load_time: Option<Duration>,
}

impl ReloadStats {
    pub(crate) fn new(
        name: &str,
        is_running: bool,
        is_visible: bool,
        timer_pending: bool,
        counters: Counters,
    ) -> Self {
        Self {
            name: name.to_string(),
            is_running,
            is_visible,
            timer_pending,
            loads_started: counters.loads_started,
            loads_succeeded: counters.loads_succeeded,
            loads_failed: counters.loads_failed,
            timers_armed: counters.timers_armed,
            timers_fired: counters.timers_fired,
            timers_cancelled: counters.timers_cancelled,
            last_interval: counters.last_interval,
            last_load_time: counters.last_load_time,
        }
    }
}

impl fmt::Display for ReloadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reload controller {}:", self.name)?;
        writeln!(
            f,
            "  Running: {}, visible: {}, timer pending: {}",
            self.is_running, self.is_visible, self.timer_pending
        )?;
        writeln!(
            f,
            "  Loads: {} started, {} succeeded, {} failed",
            self.loads_started, self.loads_succeeded, self.loads_failed
        )?;
        writeln!(
            f,
            "  Timers: {} armed, {} fired, {} cancelled",
            self.timers_armed, self.timers_fired, self.timers_cancelled
        )?;

        if let Some(interval) = self.last_interval {
            writeln!(f, "  Last interval: {:?}", interval)?;
        }
        if let Some(load_time) = self.last_load_time {
            writeln!(f, "  Last load time: {:?}", load_time)?;
        }

        Ok(())
    }
}
