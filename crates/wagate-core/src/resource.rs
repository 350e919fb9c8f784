// Loading flag and error slot shared by the resource services.

use tokio::sync::watch;
use tracing::warn;

use crate::error::CoreError;

/// Observable `loading` / `error` pair for one resource service.
#[derive(Debug)]
pub(crate) struct ResourceState {
    loading: watch::Sender<bool>,
    error: watch::Sender<Option<String>>,
}

impl ResourceState {
    pub(crate) fn new() -> Self {
        let (loading, _) = watch::channel(false);
        let (error, _) = watch::channel(None);
        Self { loading, error }
    }

    /// Start a tracked call: raise `loading` and clear the previous error.
    /// `loading` drops back when the guard does, on every exit path.
    pub(crate) fn begin(&self) -> LoadingGuard<'_> {
        self.error.send_replace(None);
        self.loading.send_replace(true);
        LoadingGuard {
            loading: &self.loading,
        }
    }

    /// Record `err` in the error slot and hand it back for propagation.
    pub(crate) fn fail(&self, err: CoreError, fallback: &str) -> CoreError {
        let message = err.user_message(fallback);
        warn!(error = %err, "{fallback}");
        self.error.send_replace(Some(message));
        err
    }

    pub(crate) fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub(crate) fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub(crate) fn watch_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub(crate) fn watch_error(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }
}

pub(crate) struct LoadingGuard<'a> {
    loading: &'a watch::Sender<bool>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading.send_replace(false);
    }
}
