//! # gsa-reload
//!
//! Adaptive polling for console views.
//!
//! A [`ReloadController`] runs a load function once when started and then
//! keeps re-running it on a timer. The delay between loads adapts to:
//!
//! - **the view's request**: a fixed interval, one of the configured defaults,
//!   or no polling at all ([`ReloadInterval`])
//! - **visibility**: hidden views fall back to the slow inactive default
//! - **load time**: a load slower than the interval pushes the next one out to
//!   1.2 times the measured load time
//!
//! A failed load stops polling until the next manual reload. Failures are
//! logged, never returned.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use gsa_reload::{ReloadController, ReloadInterval, LoadError};
//!
//! let controller = ReloadController::<String>::builder("tasks")
//!     .reload(move |filter| {
//!         let gmp = gmp.clone();
//!         async move { gmp.tasks(filter).await.map(|_| ()).map_err(LoadError::new) }
//!     })
//!     .reload_interval(|| ReloadInterval::UseDefaultActive)
//!     .build()?;
//!
//! controller.start().await;
//!
//! // Views only get the handle
//! let handle = controller.handle();
//! handle.reload(Some("rows=10".to_string())).await;
//!
//! // Dropping the controller stops polling
//! drop(controller);
//! ```

mod controller;
mod error;
mod handle;
mod interval;
pub mod logging;
mod stats;

pub use controller::{LoadFn, LoadFuture, ReloadBuilder, ReloadController, ReloadFuture};
pub use error::*;
pub use handle::ReloadHandle;
pub use interval::*;
pub use stats::ReloadStats;

pub use gsa_settings::{ReloadSettings, SharedSettings};
