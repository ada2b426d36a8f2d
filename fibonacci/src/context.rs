//! # Execution context
//!
//! An [`ExecutionContext`] is what every evaluator receives from its caller.
//! It bundles two things that travel together down a call tree:
//!
//! - a cancellation signal with an optional deadline, backed by a
//!   [`CancellationToken`], and
//! - the OpenTelemetry [`Context`] whose active span becomes the parent of
//!   the spans the evaluators open.
//!
//! Cancellation is monotonic. Once [`ExecutionContext::err`] reports a
//! reason it keeps reporting the same one. Cancelling a context cancels every
//! context derived from it, never the reverse.
//!
//! ```
//! use fibonacci::{ExecutionContext, FibError};
//! use std::time::Duration;
//!
//! let parent = ExecutionContext::background();
//! let child = parent.with_timeout(Duration::from_secs(5));
//!
//! parent.cancel();
//! assert_eq!(child.err(), Some(FibError::Cancelled));
//! ```
use crate::error::FibError;
use opentelemetry::trace::{Span, SpanRef, TraceContextExt};
use opentelemetry::Context;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Cancellation signal, deadline and span parent of one evaluation.
///
/// Cloning is cheap and clones share the same cancellation state.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    state: Arc<CancelState>,
    trace_cx: Context,
}

#[derive(Debug)]
struct CancelState {
    token: CancellationToken,
    deadline: Option<Instant>,
    reason: OnceLock<FibError>,
    parent: Option<Arc<CancelState>>,
}

impl CancelState {
    fn root(token: CancellationToken) -> Self {
        CancelState {
            token,
            deadline: None,
            reason: OnceLock::new(),
            parent: None,
        }
    }

    fn err(&self) -> Option<FibError> {
        if let Some(reason) = self.reason.get() {
            return Some(*reason);
        }

        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            let reason = *self.reason.get_or_init(|| FibError::DeadlineExceeded);
            // wake anything parked on the token, including derived contexts
            self.token.cancel();
            return Some(reason);
        }

        if self.token.is_cancelled() {
            let inherited = self
                .parent
                .as_ref()
                .and_then(|parent| parent.err())
                .unwrap_or(FibError::Cancelled);
            return Some(*self.reason.get_or_init(|| inherited));
        }

        None
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::background()
    }
}

impl ExecutionContext {
    /// A context that is never cancelled on its own and has no deadline.
    ///
    /// Spans opened under it are parented to [`Context::current`].
    pub fn background() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Adopts an existing cancellation token, e.g. one owned by a supervisor.
    pub fn from_token(token: CancellationToken) -> Self {
        ExecutionContext {
            state: Arc::new(CancelState::root(token)),
            trace_cx: Context::current(),
        }
    }

    /// Derives a child that shares this context's deadline.
    pub fn child(&self) -> Self {
        self.derive(self.state.deadline)
    }

    /// Derives a child that expires at `deadline` or at this context's
    /// deadline, whichever comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.state.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        self.derive(Some(deadline))
    }

    /// Derives a child that expires `timeout` from now.
    ///
    /// A timeout too large to be represented leaves the deadline unchanged.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// Returns a copy whose spans are parented to `cx` instead.
    pub fn with_trace_context(&self, cx: Context) -> Self {
        ExecutionContext {
            state: Arc::clone(&self.state),
            trace_cx: cx,
        }
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        ExecutionContext {
            state: Arc::new(CancelState {
                token: self.state.token.child_token(),
                deadline,
                reason: OnceLock::new(),
                parent: Some(Arc::clone(&self.state)),
            }),
            trace_cx: self.trace_cx.clone(),
        }
    }

    /// Cancels this context and every context derived from it.
    ///
    /// Calling it more than once has no further effect.
    pub fn cancel(&self) {
        let _ = self.state.reason.get_or_init(|| FibError::Cancelled);
        self.state.token.cancel();
    }

    /// True once the context was cancelled or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// `None` while the context is live, otherwise the reason it stopped.
    pub fn err(&self) -> Option<FibError> {
        self.state.err()
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }

    /// A handle to the underlying token. Cancelling it cancels this context.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.state.token.clone()
    }

    /// The OpenTelemetry context spans are parented to.
    pub fn trace_context(&self) -> &Context {
        &self.trace_cx
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        match self.state.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.state.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline.into()) => {
                        let _ = self.err();
                    }
                }
            }
            None => self.state.token.cancelled().await,
        }
    }

    pub(crate) fn with_span<S>(&self, span: S) -> Self
    where
        S: Span + Send + Sync + 'static,
    {
        self.with_trace_context(self.trace_cx.with_span(span))
    }

    pub(crate) fn span(&self) -> SpanRef<'_> {
        self.trace_cx.span()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_live() {
        let ctx = ExecutionContext::background();
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.deadline(), None);
    }

    #[test]
    fn cancel_is_monotonic_and_idempotent() {
        let ctx = ExecutionContext::background();
        ctx.cancel();
        ctx.cancel();
        assert_eq!(ctx.err(), Some(FibError::Cancelled));
        assert!(ctx.is_cancelled());
        assert!(ctx.cancellation_token().is_cancelled());
    }

    #[test]
    fn elapsed_deadline_reports_deadline_exceeded() {
        let ctx = ExecutionContext::background().with_timeout(Duration::ZERO);
        assert_eq!(ctx.err(), Some(FibError::DeadlineExceeded));

        // the first observed reason sticks
        ctx.cancel();
        assert_eq!(ctx.err(), Some(FibError::DeadlineExceeded));
    }

    #[test]
    fn child_never_cancels_parent() {
        let parent = ExecutionContext::background();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn parent_cancel_reaches_child() {
        let parent = ExecutionContext::background();
        let child = parent.with_timeout(Duration::from_secs(60));
        parent.cancel();
        assert_eq!(child.err(), Some(FibError::Cancelled));
    }

    #[test]
    fn child_inherits_earlier_parent_deadline() {
        let parent = ExecutionContext::background().with_timeout(Duration::from_millis(10));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[test]
    fn external_token_cancels_context() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::from_token(token.clone());
        token.cancel();
        assert_eq!(ctx.err(), Some(FibError::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_resolves_at_deadline() {
        let ctx = ExecutionContext::background().with_timeout(Duration::from_millis(20));
        tokio::time::timeout(Duration::from_secs(5), ctx.cancelled())
            .await
            .expect("deadline should fire");
        assert_eq!(ctx.err(), Some(FibError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn cancelled_resolves_on_cancel() {
        let ctx = ExecutionContext::background();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        ctx.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("cancel should wake waiter")
            .expect("waiter task should not panic");
    }
}
