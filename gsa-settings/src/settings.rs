//! Reload interval settings and their loaders.
//!
//! Values are stored as [`Duration`]s and serialized as integer milliseconds,
//! using the same key names as the console's `config.js` settings object.
//! A zero duration means "do not reload".

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SettingsError};

/// Default interval between reloads while the view is visible (15 seconds)
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(15);

/// Default interval while something on the page is still changing (3 seconds)
pub const DEFAULT_RELOAD_INTERVAL_ACTIVE: Duration = Duration::from_secs(3);

/// Default interval while the view is hidden (60 seconds)
pub const DEFAULT_RELOAD_INTERVAL_INACTIVE: Duration = Duration::from_secs(60);

/// Environment variable overriding [`ReloadSettings::reload_interval`]
pub const ENV_RELOAD_INTERVAL: &str = "GSA_RELOAD_INTERVAL";

/// Environment variable overriding [`ReloadSettings::reload_interval_active`]
pub const ENV_RELOAD_INTERVAL_ACTIVE: &str = "GSA_RELOAD_INTERVAL_ACTIVE";

/// Environment variable overriding [`ReloadSettings::reload_interval_inactive`]
pub const ENV_RELOAD_INTERVAL_INACTIVE: &str = "GSA_RELOAD_INTERVAL_INACTIVE";

/// The three default reload intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReloadSettings {
    /// Interval used when a view asks for the plain default
    /// Default: 15 seconds
    #[serde(with = "millis")]
    pub reload_interval: Duration,

    /// Interval used when a view asks for the "active" default and is visible
    /// Default: 3 seconds
    #[serde(with = "millis")]
    pub reload_interval_active: Duration,

    /// Interval used for every default while the view is hidden
    /// Default: 60 seconds
    #[serde(with = "millis")]
    pub reload_interval_inactive: Duration,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        Self {
            reload_interval: DEFAULT_RELOAD_INTERVAL,
            reload_interval_active: DEFAULT_RELOAD_INTERVAL_ACTIVE,
            reload_interval_inactive: DEFAULT_RELOAD_INTERVAL_INACTIVE,
        }
    }
}

impl ReloadSettings {
    /// Create settings with the built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a JSON document. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON settings file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = Self::from_json_str(&contents)?;
        debug!(path = %path.display(), ?settings, "Loaded reload settings");
        Ok(settings)
    }

    /// Built-in defaults with the process environment applied on top
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();
        settings.apply_env()?;
        Ok(settings)
    }

    /// Override values from the `GSA_RELOAD_INTERVAL*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Override values using an arbitrary variable lookup.
    ///
    /// Unset variables leave the current value alone; a set variable must be
    /// a non-negative integer number of milliseconds.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets = [
            (ENV_RELOAD_INTERVAL, &mut self.reload_interval),
            (ENV_RELOAD_INTERVAL_ACTIVE, &mut self.reload_interval_active),
            (ENV_RELOAD_INTERVAL_INACTIVE, &mut self.reload_interval_inactive),
        ];

        for (key, slot) in targets {
            if let Some(value) = lookup(key) {
                *slot = parse_millis(key, &value)?;
                debug!(key, interval_ms = slot.as_millis() as u64, "Applied environment override");
            }
        }

        Ok(())
    }

    /// Serialize to a pretty JSON document
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| SettingsError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        })
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
