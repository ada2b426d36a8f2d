#![allow(unused_macros, unused_macro_rules)]
//! Crate-internal logging macros.
//!
//! These wrap `tracing` events with a stable event `name` and the crate name
//! as target, so applications can filter evaluator chatter with
//! `RUST_LOG=fibonacci=debug` without it leaking into span exports. They
//! compile to nothing when the `internal-logs` feature is disabled.

/// Emits a debug event.
///
/// ```ignore
/// fib_debug!(name: "Recursive.Cancelled", n = 10u64, reason = "cancelled");
/// ```
macro_rules! fib_debug {
    (name: $name:expr $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            tracing::debug!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name);
        }

        #[cfg(not(feature = "internal-logs"))]
        {
            let _ = $name;
        }
    };
    (name: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            tracing::debug!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name, $($key = $value),+);
        }

        #[cfg(not(feature = "internal-logs"))]
        {
            let _ = ($name, $($value),+);
        }
    };
}

/// Emits a warning event. Same shape as [`fib_debug!`].
macro_rules! fib_warn {
    (name: $name:expr $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            tracing::warn!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name);
        }

        #[cfg(not(feature = "internal-logs"))]
        {
            let _ = $name;
        }
    };
    (name: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            tracing::warn!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name, $($key = $value),+);
        }

        #[cfg(not(feature = "internal-logs"))]
        {
            let _ = ($name, $($value),+);
        }
    };
}
