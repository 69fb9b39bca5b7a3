//! Live, shareable settings handle.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use crate::settings::ReloadSettings;

static GLOBAL: OnceLock<SharedSettings> = OnceLock::new();

/// Cloneable handle to a single [`ReloadSettings`] value.
///
/// All clones observe the same value. Readers never cache; every accessor
/// takes the lock and returns what is stored right now.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<ReloadSettings>>,
}

impl SharedSettings {
    /// Wrap settings in a new, independent handle
    pub fn new(settings: ReloadSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// The process-wide settings instance.
    ///
    /// Created with built-in defaults on first access. Controllers that are
    /// not given explicit settings read from this one.
    pub fn global() -> &'static SharedSettings {
        GLOBAL.get_or_init(SharedSettings::default)
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> ReloadSettings {
        *self.inner.read()
    }

    pub fn reload_interval(&self) -> Duration {
        self.inner.read().reload_interval
    }

    pub fn reload_interval_active(&self) -> Duration {
        self.inner.read().reload_interval_active
    }

    pub fn reload_interval_inactive(&self) -> Duration {
        self.inner.read().reload_interval_inactive
    }

    /// Mutate the stored settings in place
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ReloadSettings),
    {
        let mut guard = self.inner.write();
        f(&mut *guard);
        debug!(settings = ?*guard, "Reload settings updated");
    }

    /// Replace the stored settings wholesale
    pub fn replace(&self, settings: ReloadSettings) {
        *self.inner.write() = settings;
        debug!(?settings, "Reload settings replaced");
    }

    /// Whether two handles point at the same settings value
    pub fn ptr_eq(&self, other: &SharedSettings) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<ReloadSettings> for SharedSettings {
    fn from(settings: ReloadSettings) -> Self {
        Self::new(settings)
    }
}
