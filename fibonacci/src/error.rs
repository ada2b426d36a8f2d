//! Errors returned by the evaluators.
//!
//! Cancellation is the only abnormal outcome of a Fibonacci evaluation. It
//! is reported as a distinct error rather than a sentinel value, so
//! `Ok(0)` always means Fibonacci(0).
use thiserror::Error;

/// Result type returned by every evaluator.
pub type Result<T> = std::result::Result<T, FibError>;

/// Why an evaluation did not complete.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FibError {
    /// The execution context was cancelled explicitly.
    #[error("context cancelled")]
    Cancelled,

    /// The execution context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl FibError {
    /// Returns a short stable label (snake_case) for use in logs and span attributes.
    ///
    /// # Example
    /// ```
    /// use fibonacci::FibError;
    ///
    /// assert_eq!(FibError::DeadlineExceeded.as_label(), "deadline_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FibError::Cancelled => "cancelled",
            FibError::DeadlineExceeded => "deadline_exceeded",
        }
    }

    /// True when the error was caused by the deadline rather than an explicit cancel.
    pub fn is_deadline(&self) -> bool {
        matches!(self, FibError::DeadlineExceeded)
    }
}
