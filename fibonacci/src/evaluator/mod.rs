//! # Evaluators
//!
//! [`Fibonacci`] owns the tracer the evaluators record spans with and exposes
//! the three strategies as methods:
//!
//! - [`Fibonacci::iterate`]: straight-line loop, cancellation checked
//!   before every step.
//! - [`Fibonacci::recurse`]: double recursion, optionally short-circuited
//!   by [`Memo`](crate::memo::Memo)s, cancellation checked on entry of
//!   every call.
//! - [`Fibonacci::channel`]: one tokio task per node of the call tree,
//!   results flowing back through one-shot channels.
//!
//! Every call opens one span named `"<Kind> Fibonacci(<n>)"` under the
//! span carried by the [`ExecutionContext`], tagged with the keys in
//! [`attributes`](crate::attributes).
//!
//! The tracer is injected rather than taken from the global provider, so
//! tests can hand in a provider backed by an in-memory exporter.
mod fanout;
mod iterate;
mod recurse;

pub use fanout::PendingResult;

use crate::attributes;
use crate::context::ExecutionContext;
use crate::error::Result;
use opentelemetry::trace::noop::NoopTracer;
use opentelemetry::trace::{SpanBuilder, Tracer};
use opentelemetry::KeyValue;
use std::fmt;
use std::sync::Arc;

/// How the fan-out evaluator reacts to cancellation that arrives after a
/// node has spawned its children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CancelPolicy {
    /// Each node looks at the context once, when its task starts. A node
    /// already waiting on its children keeps waiting; the subtree stops only
    /// as its not-yet-started nodes observe the cancellation.
    #[default]
    EntryChecked,
    /// A waiting node also races its children against the context and
    /// abandons them as soon as the context is cancelled.
    Preemptive,
}

/// Fibonacci evaluators recording spans with tracer `T`.
///
/// Cloning is cheap; clones share the tracer.
pub struct Fibonacci<T> {
    tracer: Arc<T>,
    policy: CancelPolicy,
}

impl<T> Clone for Fibonacci<T> {
    fn clone(&self) -> Self {
        Fibonacci {
            tracer: Arc::clone(&self.tracer),
            policy: self.policy,
        }
    }
}

impl<T> fmt::Debug for Fibonacci<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fibonacci")
            .field("policy", &self.policy)
            .finish()
    }
}

impl Fibonacci<NoopTracer> {
    /// Evaluators that record nothing.
    pub fn noop() -> Self {
        Fibonacci::new(NoopTracer::new())
    }
}

impl Default for Fibonacci<NoopTracer> {
    fn default() -> Self {
        Self::noop()
    }
}

impl<T> Fibonacci<T>
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + Sync + 'static,
{
    /// Evaluators recording spans with `tracer` and the default
    /// [`CancelPolicy`].
    pub fn new(tracer: T) -> Self {
        Self::builder(tracer).build()
    }

    /// Starts configuring evaluators around `tracer`.
    pub fn builder(tracer: T) -> FibonacciBuilder<T> {
        FibonacciBuilder {
            tracer,
            policy: CancelPolicy::default(),
        }
    }

    /// The policy used by [`Fibonacci::channel`].
    pub fn cancel_policy(&self) -> CancelPolicy {
        self.policy
    }

    fn start_span(&self, kind: &str, n: u64, parent: &ExecutionContext) -> ExecutionContext {
        let span = SpanBuilder::from_name(format!("{kind} Fibonacci({n})"))
            .with_attributes([KeyValue::new(attributes::N, attributes::int_value(n))])
            .start_with_context(self.tracer.as_ref(), parent.trace_context());
        parent.with_span(span)
    }
}

/// Records the outcome of a call on the span carried by `cx` and ends it.
fn finish_span(cx: &ExecutionContext, outcome: &Result<u64>) {
    let span = cx.span();
    match outcome {
        Ok(value) => span.set_attribute(KeyValue::new(
            attributes::RESULT,
            attributes::int_value(*value),
        )),
        Err(err) => {
            span.set_attribute(KeyValue::new(attributes::CANCELLED, true));
            span.set_attribute(KeyValue::new(attributes::CANCEL_REASON, err.as_label()));
        }
    }
    span.end();
}

/// Builder for [`Fibonacci`].
#[derive(Debug)]
pub struct FibonacciBuilder<T> {
    tracer: T,
    policy: CancelPolicy,
}

impl<T> FibonacciBuilder<T>
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + Sync + 'static,
{
    /// Sets how [`Fibonacci::channel`] reacts to late cancellation.
    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Creates the evaluators.
    pub fn build(self) -> Fibonacci<T> {
        Fibonacci {
            tracer: Arc::new(self.tracer),
            policy: self.policy,
        }
    }
}
