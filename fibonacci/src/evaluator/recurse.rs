use super::{finish_span, Fibonacci};
use crate::attributes;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::memo::Memo;
use opentelemetry::trace::Tracer;
use opentelemetry::KeyValue;

// Stack left before a recursive call grows a new segment, and the size of
// that segment. One segment holds a few thousand nested calls.
const RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

impl<T> Fibonacci<T>
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + Sync + 'static,
{
    /// Computes Fibonacci(`n`) by double recursion.
    ///
    /// Each call checks the context on entry, then asks `memos` for `n` in
    /// the order given; the first hit is returned without recursing.
    /// Whatever value a call produces (base case, memo hit or sum) is
    /// stored into every memo before returning, so later calls anywhere in
    /// the tree can reuse it. A cancelled call produces no value and stores
    /// nothing.
    ///
    /// Memos are used from the calling thread only. Share results across
    /// threads with [`SharedMemo`](crate::memo::SharedMemo).
    ///
    /// The recursion is `n` calls deep before the first memo hit can cut
    /// it short. The stack is grown on the heap as needed, so deep inputs
    /// such as `n = 100_000` with a memo cost memory, not a stack overflow.
    ///
    /// ```
    /// use fibonacci::memo::{Memo, SimpleMemo};
    /// use fibonacci::{ExecutionContext, Fibonacci};
    ///
    /// let fib = Fibonacci::noop();
    /// let ctx = ExecutionContext::background();
    /// let mut memo = SimpleMemo::new();
    ///
    /// assert_eq!(fib.recurse(&ctx, 10, &mut []), Ok(55));
    /// assert_eq!(fib.recurse(&ctx, 50, &mut [&mut memo]), Ok(12_586_269_025));
    /// assert_eq!(memo.lookup(49), Some(7_778_742_049));
    /// ```
    pub fn recurse(
        &self,
        ctx: &ExecutionContext,
        n: u64,
        memos: &mut [&mut dyn Memo],
    ) -> Result<u64> {
        let cx = self.start_span("Recursive", n, ctx);
        let outcome = self.recurse_step(&cx, n, memos);
        finish_span(&cx, &outcome);
        outcome
    }

    fn recurse_step(
        &self,
        cx: &ExecutionContext,
        n: u64,
        memos: &mut [&mut dyn Memo],
    ) -> Result<u64> {
        if let Some(err) = cx.err() {
            fib_debug!(
                name: "Recursive.Cancelled",
                n = n,
                reason = err.as_label(),
            );
            return Err(err);
        }

        let hit = memos.iter().find_map(|memo| memo.lookup(n));
        let value = match hit {
            Some(hit) => {
                cx.span()
                    .set_attribute(KeyValue::new(attributes::FROM_MEMO, true));
                hit
            }
            None if n <= 1 => n,
            None => {
                let one_back = stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || {
                    self.recurse(cx, n - 1, memos)
                })?;
                let two_back = stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || {
                    self.recurse(cx, n - 2, memos)
                })?;
                one_back.wrapping_add(two_back)
            }
        };

        for memo in memos.iter_mut() {
            memo.store(n, value);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memo::{BoundedMemo, SimpleMemo};
    use crate::FibError;

    /// Memo that records the order of stores.
    #[derive(Default)]
    struct Spy {
        inner: SimpleMemo,
        stores: Vec<u64>,
    }

    impl Memo for Spy {
        fn lookup(&self, index: u64) -> Option<u64> {
            self.inner.lookup(index)
        }

        fn store(&mut self, index: u64, value: u64) {
            self.stores.push(index);
            self.inner.store(index, value);
        }
    }

    #[test]
    fn first_hit_wins() {
        let fib = Fibonacci::noop();
        let ctx = ExecutionContext::background();

        // a wrong value planted in the first memo proves the second is never consulted
        let mut first = SimpleMemo::new();
        first.store(4, 100);
        let mut second = SimpleMemo::new();
        second.store(4, 3);

        let value = fib.recurse(&ctx, 4, &mut [&mut first, &mut second]);

        assert_eq!(value, Ok(100));
        // stored back into every memo on the way out
        assert_eq!(second.lookup(4), Some(100));
    }

    #[test]
    fn values_are_stored_into_every_memo() {
        let fib = Fibonacci::noop();
        let ctx = ExecutionContext::background();
        let mut simple = SimpleMemo::new();
        let mut bounded = BoundedMemo::with_capacity(3);

        assert_eq!(fib.recurse(&ctx, 12, &mut [&mut simple, &mut bounded]), Ok(144));

        for index in 0..=12 {
            assert!(simple.lookup(index).is_some(), "missing index {index}");
        }
        assert_eq!(bounded.lookup(12), Some(144));
        assert_eq!(bounded.len(), 3);
    }

    #[test]
    fn cancelled_call_stores_nothing() {
        let fib = Fibonacci::noop();
        let ctx = ExecutionContext::background();
        ctx.cancel();
        let mut spy = Spy::default();

        assert_eq!(fib.recurse(&ctx, 10, &mut [&mut spy]), Err(FibError::Cancelled));
        assert!(spy.stores.is_empty());
        assert!(spy.inner.is_empty());
    }

    #[test]
    fn deep_memoized_descent_completes() {
        let fib = Fibonacci::noop();
        let ctx = ExecutionContext::background();
        let mut memo = SimpleMemo::new();

        let deep = fib.recurse(&ctx, 50_000, &mut [&mut memo]);

        assert_eq!(deep, fib.iterate(&ctx, 50_000));
        assert_eq!(memo.len(), 50_001);
    }

    #[test]
    fn memo_is_filled_bottom_up() {
        let fib = Fibonacci::noop();
        let ctx = ExecutionContext::background();
        let mut spy = Spy::default();

        assert_eq!(fib.recurse(&ctx, 5, &mut [&mut spy]), Ok(5));
        // 1 and 0 finish first, 5 last
        assert_eq!(spy.stores.first(), Some(&1));
        assert_eq!(spy.stores.last(), Some(&5));
    }
}
