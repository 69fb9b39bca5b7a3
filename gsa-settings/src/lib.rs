//! # gsa-settings
//!
//! Process-wide settings for the web console's polling machinery.
//!
//! The reload controller never snapshots its default intervals. It keeps a
//! [`SharedSettings`] handle and reads through it every time a new delay has
//! to be chosen, so changing a value here is picked up by every running
//! controller on its next timer.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use gsa_settings::{ReloadSettings, SharedSettings};
//!
//! let settings = SharedSettings::new(ReloadSettings::from_env()?);
//! settings.update(|s| s.reload_interval = Duration::from_secs(30));
//! assert_eq!(settings.reload_interval(), Duration::from_secs(30));
//! ```

mod error;
mod settings;
mod shared;

pub use error::*;
pub use settings::*;
pub use shared::*;
