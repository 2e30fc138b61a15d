//! Request lifecycle events.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RpcError;

/// Observer notified of request lifecycle events, e.g. to feed metrics.
///
/// Every method defaults to doing nothing. Calls happen on the request path,
/// so implementations should return quickly.
pub trait EventListener: Send + Sync {
    /// A request for a registered method is about to be bound and invoked
    fn on_new_request(&self, method: &str) {
        let _ = method;
    }

    /// The handler finished, successfully or not
    fn on_request_handled(&self, method: &str, took: Duration) {
        let _ = (method, took);
    }

    /// Binding failed or the handler returned an error
    fn on_request_failed(&self, method: &str, error: &RpcError) {
        let _ = (method, error);
    }
}

type NewRequestFn = Arc<dyn Fn(&str) + Send + Sync>;
type HandledFn = Arc<dyn Fn(&str, Duration) + Send + Sync>;
type FailedFn = Arc<dyn Fn(&str, &RpcError) + Send + Sync>;

/// An [`EventListener`] built from optional callbacks.
///
/// Events without a callback are ignored; `SelectiveListener::default()` is
/// the server's no-op listener.
#[derive(Clone, Default)]
pub struct SelectiveListener {
    new_request: Option<NewRequestFn>,
    handled: Option<HandledFn>,
    failed: Option<FailedFn>,
}

impl SelectiveListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when_new_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.new_request = Some(Arc::new(f));
        self
    }

    pub fn when_request_handled<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.handled = Some(Arc::new(f));
        self
    }

    pub fn when_request_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &RpcError) + Send + Sync + 'static,
    {
        self.failed = Some(Arc::new(f));
        self
    }
}

impl EventListener for SelectiveListener {
    fn on_new_request(&self, method: &str) {
        if let Some(f) = &self.new_request {
            f(method);
        }
    }

    fn on_request_handled(&self, method: &str, took: Duration) {
        if let Some(f) = &self.handled {
            f(method, took);
        }
    }

    fn on_request_failed(&self, method: &str, error: &RpcError) {
        if let Some(f) = &self.failed {
            f(method, error);
        }
    }
}

impl fmt::Debug for SelectiveListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectiveListener")
            .field("new_request", &self.new_request.is_some())
            .field("handled", &self.handled.is_some())
            .field("failed", &self.failed.is_some())
            .finish()
    }
}
