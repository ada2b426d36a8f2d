use super::{finish_span, Fibonacci};
use crate::context::ExecutionContext;
use crate::error::Result;
use opentelemetry::trace::Tracer;

impl<T> Fibonacci<T>
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + Sync + 'static,
{
    /// Computes Fibonacci(`n`) with a loop.
    ///
    /// The context is checked before every step; a cancelled context stops
    /// the loop and its reason is returned instead of a partial value.
    /// Results past Fibonacci(93) wrap modulo 2^64.
    ///
    /// ```
    /// use fibonacci::{ExecutionContext, Fibonacci};
    ///
    /// let fib = Fibonacci::noop();
    /// assert_eq!(fib.iterate(&ExecutionContext::background(), 20), Ok(6765));
    /// ```
    pub fn iterate(&self, ctx: &ExecutionContext, n: u64) -> Result<u64> {
        let cx = self.start_span("Iterative", n, ctx);
        let outcome = iterate(&cx, n);
        if let Err(err) = &outcome {
            fib_debug!(
                name: "Iterative.Cancelled",
                n = n,
                reason = err.as_label(),
            );
        }
        finish_span(&cx, &outcome);
        outcome
    }
}

fn iterate(ctx: &ExecutionContext, n: u64) -> Result<u64> {
    if n <= 1 {
        return Ok(n);
    }

    let (mut previous, mut current) = (0u64, 1u64);
    for _ in 2..=n {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let next = previous.wrapping_add(current);
        previous = current;
        current = next;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FibError;
    use std::time::{Duration, Instant};

    #[test]
    fn base_cases_skip_the_loop() {
        let ctx = ExecutionContext::background();
        ctx.cancel();
        // no step runs, so there is nothing to cancel
        assert_eq!(iterate(&ctx, 0), Ok(0));
        assert_eq!(iterate(&ctx, 1), Ok(1));
        assert_eq!(iterate(&ctx, 2), Err(FibError::Cancelled));
    }

    #[test]
    fn largest_exact_value() {
        let ctx = ExecutionContext::background();
        assert_eq!(iterate(&ctx, 93), Ok(12_200_160_415_121_876_738));
    }

    #[test]
    fn deadline_stops_long_loop() {
        let ctx = ExecutionContext::background().with_timeout(Duration::from_millis(10));
        let start = Instant::now();

        let outcome = Fibonacci::noop().iterate(&ctx, 10_000_000_000);

        assert_eq!(outcome, Err(FibError::DeadlineExceeded));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(ctx.err().is_some());
    }
}
