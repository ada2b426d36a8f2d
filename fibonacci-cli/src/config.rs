//! Command line and environment configuration of `fib`.
use anyhow::bail;
use clap::{Parser, ValueEnum};
use fibonacci::memo::{BoundedMemo, Memo, SharedMemo, SimpleMemo};
use fibonacci::CancelPolicy;
use std::time::Duration;

/// Where the OTLP/HTTP exporter sends spans unless told otherwise.
pub(crate) const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318/v1/traces";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Strategy {
    /// Loop.
    Iterate,
    /// Double recursion, optionally memoized.
    Recurse,
    /// One tokio task per call.
    Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum MemoKind {
    /// Unbounded table.
    Simple,
    /// Table keeping at most --memo-capacity results.
    Bounded,
    /// Lock-protected table.
    Shared,
}

impl MemoKind {
    pub(crate) fn build(self, capacity: usize) -> Box<dyn Memo> {
        match self {
            MemoKind::Simple => Box::new(SimpleMemo::new()),
            MemoKind::Bounded => Box::new(BoundedMemo::with_capacity(capacity)),
            MemoKind::Shared => Box::new(SharedMemo::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ExporterKind {
    /// Print finished spans to stdout.
    Stdout,
    /// Send spans to an OTLP collector over HTTP.
    Otlp,
    /// Record nothing.
    #[value(name = "none")]
    Disabled,
}

/// Computes a Fibonacci number and traces how it got there.
#[derive(Debug, Parser)]
#[command(name = "fib", version, about)]
pub(crate) struct Config {
    /// Index of the Fibonacci number to compute.
    #[arg(env = "FIB_N", default_value_t = 10)]
    pub(crate) n: u64,

    /// Evaluation strategy.
    #[arg(long, env = "FIB_STRATEGY", value_enum, default_value_t = Strategy::Recurse)]
    pub(crate) strategy: Strategy,

    /// Memos for the recursive strategy, consulted in the order given.
    #[arg(long = "memo", env = "FIB_MEMO", value_enum, value_delimiter = ',')]
    pub(crate) memos: Vec<MemoKind>,

    /// Capacity of `bounded` memos.
    #[arg(long, env = "FIB_MEMO_CAPACITY", default_value_t = 64)]
    pub(crate) memo_capacity: usize,

    /// Cancel the computation after this many milliseconds.
    #[arg(long, env = "FIB_TIMEOUT_MS")]
    pub(crate) timeout_ms: Option<u64>,

    /// Let waiting `channel` tasks abandon their children on cancellation.
    #[arg(long, env = "FIB_PREEMPTIVE")]
    pub(crate) preemptive: bool,

    /// Span exporter.
    #[arg(long, env = "FIB_EXPORTER", value_enum, default_value_t = ExporterKind::Stdout)]
    pub(crate) exporter: ExporterKind,

    /// OTLP/HTTP traces endpoint, used with `--exporter otlp`.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT", default_value = DEFAULT_OTLP_ENDPOINT)]
    pub(crate) otlp_endpoint: String,

    /// `service.name` of the exported resource.
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "fibonacci")]
    pub(crate) service_name: String,
}

impl Config {
    /// Rejects option combinations that would be silently ignored.
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if !self.memos.is_empty() && self.strategy != Strategy::Recurse {
            bail!("--memo only applies to --strategy recurse");
        }
        if self.preemptive && self.strategy != Strategy::Channel {
            bail!("--preemptive only applies to --strategy channel");
        }
        Ok(())
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn cancel_policy(&self) -> CancelPolicy {
        if self.preemptive {
            CancelPolicy::Preemptive
        } else {
            CancelPolicy::EntryChecked
        }
    }

    pub(crate) fn build_memos(&self) -> Vec<Box<dyn Memo>> {
        self.memos
            .iter()
            .map(|kind| kind.build(self.memo_capacity))
            .collect()
    }
}
