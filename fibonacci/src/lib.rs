//! # Fibonacci evaluators
//!
//! Three interchangeable ways of computing Fibonacci numbers, each
//! recording OpenTelemetry spans through an injected tracer:
//!
//! - [`Fibonacci::iterate`]: a loop.
//! - [`Fibonacci::recurse`]: double recursion, optionally sped up by
//!   pluggable [`memo::Memo`] strategies.
//! - [`Fibonacci::channel`]: fan-out/fan-in over tokio tasks and one-shot
//!   channels.
//!
//! Every evaluator takes an [`ExecutionContext`], which carries a
//! cancellation signal, an optional deadline and the parent span. A
//! cancelled evaluation returns [`FibError`], never a sentinel value.
//!
//! ## Getting started
//!
//! ```
//! use fibonacci::memo::SimpleMemo;
//! use fibonacci::{attributes, ExecutionContext, Fibonacci};
//! use opentelemetry::trace::TracerProvider;
//! use opentelemetry_sdk::trace::SdkTracerProvider;
//!
//! let provider = SdkTracerProvider::builder().build();
//! let fib = Fibonacci::new(provider.tracer_with_scope(attributes::instrumentation_scope()));
//! let ctx = ExecutionContext::background();
//!
//! assert_eq!(fib.iterate(&ctx, 10), Ok(55));
//!
//! let mut memo = SimpleMemo::new();
//! assert_eq!(fib.recurse(&ctx, 10, &mut [&mut memo]), Ok(55));
//! ```
//!
//! ## Cancellation
//!
//! Cancellation is cooperative. The iterative evaluator checks before every
//! step, the recursive one on entry of every call and the fan-out one when
//! each task starts (plus, with [`CancelPolicy::Preemptive`], while a task
//! waits on its children). Work already under way is not interrupted.
//!
//! ## Crate Feature Flags
//!
//! * `internal-logs` (enabled by default): emits `tracing` debug events for
//!   cancelled calls, with target `fibonacci`.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

#[macro_use]
mod internal_logging;

pub mod attributes;
pub mod context;
pub mod error;
mod evaluator;
pub mod memo;

pub use context::ExecutionContext;
pub use error::{FibError, Result};
pub use evaluator::{CancelPolicy, Fibonacci, FibonacciBuilder, PendingResult};
