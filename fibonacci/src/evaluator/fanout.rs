use super::{finish_span, CancelPolicy, Fibonacci};
use crate::context::ExecutionContext;
use crate::error::{FibError, Result};
use opentelemetry::trace::Tracer;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio::sync::oneshot;

/// The eventual result of [`Fibonacci::channel`].
///
/// Resolves to the computed value, or to the context's cancellation reason
/// if the task producing it stopped without a value. It never waits on a
/// task that has already given up.
#[derive(Debug)]
pub struct PendingResult {
    rx: oneshot::Receiver<u64>,
    ctx: ExecutionContext,
}

impl Future for PendingResult {
    type Output = Result<u64>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            // the sender was dropped without a value: the node was cancelled
            Poll::Ready(Err(_closed)) => {
                Poll::Ready(Err(this.ctx.err().unwrap_or(FibError::Cancelled)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Fibonacci<T>
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + Sync + 'static,
{
    /// Computes Fibonacci(`n`) by fanning out one task per call.
    ///
    /// Spawns a task right away and returns a handle to its result. The
    /// task checks the context when it starts; if cancelled it finishes
    /// without a value and spawns nothing. Otherwise `n <= 1` is answered
    /// directly and larger `n` spawn tasks for `n - 1` and `n - 2` and add
    /// their results, so `2 * Fibonacci(n + 1) - 1` tasks run in total.
    ///
    /// Cancellation arriving while a task waits on its children is handled
    /// according to the [`CancelPolicy`]. In either case a child that stops
    /// without a value makes its parent stop without a value too.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    ///
    /// ```
    /// use fibonacci::{ExecutionContext, Fibonacci};
    ///
    /// # #[tokio::main(flavor = "multi_thread")]
    /// # async fn main() {
    /// let fib = Fibonacci::noop();
    /// let value = fib.channel(&ExecutionContext::background(), 10).await;
    /// assert_eq!(value, Ok(55));
    /// # }
    /// ```
    pub fn channel(&self, ctx: &ExecutionContext, n: u64) -> PendingResult {
        let (tx, rx) = oneshot::channel();
        let evaluator = self.clone();
        let parent = ctx.clone();

        tokio::spawn(async move {
            if let Ok(value) = evaluator.fan_out(&parent, n).await {
                if tx.send(value).is_err() {
                    fib_debug!(name: "Channel.ResultAbandoned", n = n);
                }
            }
        });

        PendingResult {
            rx,
            ctx: ctx.clone(),
        }
    }

    async fn fan_out(&self, ctx: &ExecutionContext, n: u64) -> Result<u64> {
        let cx = self.start_span("Channel", n, ctx);
        let outcome = self.fan_out_node(&cx, n).await;
        if let Err(err) = &outcome {
            fib_debug!(
                name: "Channel.Cancelled",
                n = n,
                reason = err.as_label(),
            );
        }
        finish_span(&cx, &outcome);
        outcome
    }

    async fn fan_out_node(&self, cx: &ExecutionContext, n: u64) -> Result<u64> {
        if let Some(err) = cx.err() {
            return Err(err);
        }
        if n <= 1 {
            return Ok(n);
        }

        let one_back = self.channel(cx, n - 1);
        let two_back = self.channel(cx, n - 2);
        let both = async {
            let (one_back, two_back) = tokio::join!(one_back, two_back);
            one_back.and_then(|a| two_back.map(|b| a.wrapping_add(b)))
        };

        match self.policy {
            CancelPolicy::EntryChecked => both.await,
            CancelPolicy::Preemptive => {
                tokio::select! {
                    biased;
                    _ = cx.cancelled() => Err(cx.err().unwrap_or(FibError::Cancelled)),
                    outcome = both => outcome,
                }
            }
        }
    }
}
