//! Per-call context: cancellation and request timeouts.
//!
//! Every [`StoreClient`](crate::client::StoreClient) primitive receives a [`CallContext`].
//! Clients apply the timeout to the request they issue; the connector races every call
//! against the cancellation signal so that any client can be cancelled.
//!
//! # Example
//!
//! ```ignore
//! use firelayer_core::context::CallContext;
//! use std::time::Duration;
//!
//! let (ctx, handle) = CallContext::cancellable();
//! let ctx = ctx.with_timeout(Duration::from_secs(5));
//!
//! // later, from another task
//! handle.cancel();
//! ```

use futures::{
    channel::oneshot,
    future::{self, Either, FutureExt, Shared},
};
use std::{fmt, future::Future, pin::pin, time::Duration};

use crate::error::{ConnectorError, ConnectorResult};

/// Cancellation signal and deadline attached to every store call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: Option<CancelToken>,
    timeout: Option<Duration>,
}

impl CallContext {
    /// A context that never cancels and has no timeout.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that is cancelled through the returned [`CancelHandle`].
    pub fn cancellable() -> (Self, CancelHandle) {
        let (sender, receiver) = oneshot::channel();
        let ctx = Self {
            cancel: Some(CancelToken(receiver.shared())),
            timeout: None,
        };

        (ctx, CancelHandle(sender))
    }

    /// Sets the per-request timeout clients should apply.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Applies `timeout` unless the context already carries one.
    pub fn or_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = self.timeout.or(timeout);
        self
    }

    /// The per-request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether cancellation has already been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|token| matches!(token.0.clone().now_or_never(), Some(Ok(()))))
    }

    /// Drives `call` to completion unless the context is cancelled first.
    ///
    /// A call that has not been polled yet is never started once cancellation
    /// was requested.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> ConnectorResult<T>
    where
        F: Future<Output = ConnectorResult<T>>,
    {
        let Some(token) = &self.cancel else {
            return call.await;
        };

        if self.is_cancelled() {
            return Err(ConnectorError::Cancelled(operation.to_string()));
        }

        let call = pin!(call);
        let cancelled = pin!(token.cancelled());

        match future::select(call, cancelled).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(ConnectorError::Cancelled(operation.to_string())),
        }
    }
}

/// Receiving side of a cancellation signal. Cheap to clone.
#[derive(Clone)]
pub struct CancelToken(Shared<oneshot::Receiver<()>>);

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken").finish_non_exhaustive()
    }
}

impl CancelToken {
    /// Resolves once cancellation is requested. Never resolves if the handle is
    /// dropped without cancelling.
    async fn cancelled(&self) {
        match self.0.clone().await {
            Ok(()) => (),
            Err(_) => future::pending().await,
        }
    }
}

/// Sending side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(oneshot::Sender<()>);

impl CancelHandle {
    /// Requests cancellation of every call made with the paired context.
    pub fn cancel(self) {
        // The receiver is gone only when every context clone was dropped.
        let _ = self.0.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_context_runs_calls() {
        let ctx = CallContext::background();
        let result = ctx.run("read_child", async { Ok(1) }).await;

        assert_eq!(result, Ok(1));
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let (ctx, handle) = CallContext::cancellable();
        handle.cancel();

        assert!(ctx.is_cancelled());
        let result = ctx
            .run("read_child", async {
                Err::<(), _>(ConnectorError::store("read_child", "call must not start"))
            })
            .await;
        assert_eq!(result, Err(ConnectorError::Cancelled("read_child".into())));
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_calls() {
        let (ctx, handle) = CallContext::cancellable();
        let pending = ctx.run("read_collection", future::pending::<ConnectorResult<()>>());

        handle.cancel();

        assert_eq!(
            pending.await,
            Err(ConnectorError::Cancelled("read_collection".into()))
        );
    }

    #[tokio::test]
    async fn dropped_handle_never_cancels() {
        let (ctx, handle) = CallContext::cancellable();
        drop(handle);

        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.run("exists", async { Ok(true) }).await, Ok(true));
    }

    #[test]
    fn explicit_timeout_wins_over_default() {
        let ctx = CallContext::background()
            .with_timeout(Duration::from_secs(1))
            .or_timeout(Some(Duration::from_secs(9)));
        assert_eq!(ctx.timeout(), Some(Duration::from_secs(1)));

        let ctx = CallContext::background().or_timeout(Some(Duration::from_secs(9)));
        assert_eq!(ctx.timeout(), Some(Duration::from_secs(9)));
    }
}
