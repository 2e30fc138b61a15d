//! Per-call context handed down to handlers.
//!
//! A [`RequestContext`] carries a cooperative cancellation signal, an optional
//! deadline and an optional handle to the connection the request came in on.
//! Handlers only ever read it.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Out-of-band write access to the underlying connection, e.g. for pushing
/// subscription notifications on the socket a request arrived on.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn write(&self, payload: &[u8]) -> io::Result<()>;
}

#[async_trait]
impl<W> Connection for tokio::sync::Mutex<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&self, payload: &[u8]) -> io::Result<()> {
        let mut writer = self.lock().await;
        writer.write_all(payload).await?;
        writer.flush().await
    }
}

/// Cancellation, deadline and connection for one call.
///
/// Clone-friendly; clones share the same cancellation state.
#[derive(Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    connection: Option<Arc<dyn Connection>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing token, so that cancelling it from outside reaches
    /// every handler running under this context.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Derive a context whose cancellation follows this one but can also be
    /// cancelled on its own without affecting the parent.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            connection: self.connection.clone(),
        }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once cancelled or once the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves when the context is cancelled or its deadline expires.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The connection the request arrived on, if the caller attached one.
    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.connection.clone()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .field("connection", &self.connection.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_context_not_cancelled() {
        let ctx = RequestContext::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.remaining().is_none());
        assert!(ctx.connection().is_none());
    }

    #[tokio::test]
    async fn test_child_follows_parent() {
        let parent = RequestContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_cancel_leaves_parent() {
        let parent = RequestContext::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_resolves_cancelled() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_cancelled());

        tokio::time::timeout(Duration::from_secs(1), ctx.cancelled())
            .await
            .expect("cancelled() should resolve once the deadline passes");
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_connection_writes_through() {
        let sink = Arc::new(tokio::sync::Mutex::new(Vec::<u8>::new()));
        let ctx = RequestContext::new().with_connection(sink.clone());

        let conn = ctx.connection().expect("connection attached");
        conn.write(b"{\"push\":1}").await.unwrap();

        assert_eq!(sink.lock().await.as_slice(), b"{\"push\":1}");
    }
}
