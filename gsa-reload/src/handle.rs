//! The reload capability handed to consumers.

use std::sync::Arc;

use crate::controller::{Inner, ReloadFuture};

/// Cloneable handle exposing a controller's manual reload.
///
/// Views get one of these instead of the controller itself. Once the
/// controller is stopped or dropped, every call is a no-op.
pub struct ReloadHandle<O = ()> {
    inner: Arc<Inner<O>>,
}

impl<O> ReloadHandle<O> {
    pub(crate) fn new(inner: Arc<Inner<O>>) -> Self {
        Self { inner }
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

    /// Report whether the consuming view is currently shown
    pub fn set_visible(&self, visible: bool) {
        self.inner.set_visible(visible);
    }
}

impl<O: Send + 'static> ReloadHandle<O> {
    /// Trigger a reload with `options`, see [`crate::ReloadController::reload`]
    pub fn reload(&self, options: Option<O>) -> ReloadFuture {
        self.inner.reload(options)
    }
}

impl<O> Clone for ReloadHandle<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O> std::fmt::Debug for ReloadHandle<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadHandle")
            .field("name", &self.inner.name())
            .finish()
    }
}
