//! `fib`: computes one Fibonacci number with the chosen evaluator and
//! exports the resulting span tree.
use anyhow::Context as _;
use clap::Parser;
use fibonacci::memo::Memo;
use fibonacci::{attributes, ExecutionContext, FibError, Fibonacci};
use opentelemetry::trace::{TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::SdkTracer;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

mod config;
mod telemetry;

use config::{Config, Strategy};

fn main() -> anyhow::Result<ExitCode> {
    let config = Config::parse();
    config.validate()?;

    telemetry::init_logging()?;
    // Built before the runtime: the blocking OTLP client owns its own
    // runtime and must not be created from inside ours.
    let provider = telemetry::init_tracer_provider(&config)?;
    let tracer = provider.tracer_with_scope(attributes::instrumentation_scope());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build the tokio runtime")?;

    let main_span = tracer.start("main");
    let mut ctx =
        ExecutionContext::background().with_trace_context(Context::current_with_span(main_span));
    if let Some(timeout) = config.timeout() {
        ctx = ctx.with_timeout(timeout);
    }

    let token = ctx.cancellation_token();
    ctrlc::set_handler(move || token.cancel()).context("failed to install the Ctrl-C handler")?;

    let fib = Fibonacci::builder(tracer)
        .with_cancel_policy(config.cancel_policy())
        .build();

    info!(
        n = config.n,
        strategy = ?config.strategy,
        memos = ?config.memos,
        "computing"
    );
    let outcome = run(&config, &fib, &ctx, &runtime);

    let span = ctx.trace_context().span();
    match outcome {
        Ok(value) => {
            span.set_attribute(KeyValue::new(
                attributes::RESULT,
                attributes::int_value(value),
            ));
            span.end();
            info!(n = config.n, result = value, "done");
            println!("{value}");
        }
        Err(err) => {
            span.set_attribute(KeyValue::new(attributes::CANCELLED, true));
            span.set_attribute(KeyValue::new(attributes::CANCEL_REASON, err.as_label()));
            span.end();
            warn!(n = config.n, reason = err.as_label(), "stopped before completion");
            eprintln!("{}", cancellation_message(err, config.timeout()));
        }
    }

    drop(runtime);
    provider.shutdown()?;

    Ok(match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::from(1),
    })
}

fn run(
    config: &Config,
    fib: &Fibonacci<SdkTracer>,
    ctx: &ExecutionContext,
    runtime: &tokio::runtime::Runtime,
) -> Result<u64, FibError> {
    match config.strategy {
        Strategy::Iterate => fib.iterate(ctx, config.n),
        Strategy::Recurse => {
            let mut owned = config.build_memos();
            let mut memos: Vec<&mut dyn Memo> = Vec::with_capacity(owned.len());
            for memo in owned.iter_mut() {
                memos.push(&mut **memo);
            }
            fib.recurse(ctx, config.n, &mut memos)
        }
        // Spawning needs the runtime context, so build the tree inside it.
        Strategy::Channel => runtime.block_on(async { fib.channel(ctx, config.n).await }),
    }
}

fn cancellation_message(err: FibError, timeout: Option<Duration>) -> String {
    match timeout {
        Some(timeout) if err.is_deadline() => {
            format!("cancelled: {err} after {}ms", timeout.as_millis())
        }
        _ => format!("cancelled: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_message_names_the_timeout() {
        let message =
            cancellation_message(FibError::DeadlineExceeded, Some(Duration::from_millis(50)));
        assert_eq!(message, "cancelled: context deadline exceeded after 50ms");
    }

    #[test]
    fn interrupt_message_ignores_the_timeout() {
        let message = cancellation_message(FibError::Cancelled, Some(Duration::from_millis(50)));
        assert_eq!(message, "cancelled: context cancelled");
        assert_eq!(
            cancellation_message(FibError::Cancelled, None),
            "cancelled: context cancelled"
        );
    }
}
