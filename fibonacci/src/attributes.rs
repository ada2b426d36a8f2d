//! Span attribute keys and the instrumentation scope of the evaluators.
use opentelemetry::{InstrumentationScope, Key};

/// The index being computed. Set when the span starts.
pub const N: Key = Key::from_static_str("n");

/// The computed value. Set when the call completes.
pub const RESULT: Key = Key::from_static_str("result");

/// Set to `true` when the call stopped because its context was cancelled.
pub const CANCELLED: Key = Key::from_static_str("cancelled");

/// Label of the cancellation reason, see [`FibError::as_label`](crate::FibError::as_label).
pub const CANCEL_REASON: Key = Key::from_static_str("cancel.reason");

/// Set to `true` when the value came from a memo instead of being computed.
pub const FROM_MEMO: Key = Key::from_static_str("from_memo");

/// Scope under which the evaluators' spans should be recorded.
///
/// ```
/// use opentelemetry::trace::TracerProvider;
/// use opentelemetry_sdk::trace::SdkTracerProvider;
///
/// let provider = SdkTracerProvider::builder().build();
/// let tracer = provider.tracer_with_scope(fibonacci::attributes::instrumentation_scope());
/// let fib = fibonacci::Fibonacci::new(tracer);
/// # let _ = fib;
/// ```
pub fn instrumentation_scope() -> InstrumentationScope {
    InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(opentelemetry_semantic_conventions::SCHEMA_URL)
        .build()
}

/// Converts a `u64` for use as an integer attribute value.
///
/// Attribute integers are signed; values above `i64::MAX` saturate instead
/// of wrapping.
///
/// ```
/// assert_eq!(fibonacci::attributes::int_value(u64::MAX), i64::MAX);
/// ```
pub fn int_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
