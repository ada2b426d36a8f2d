//! Tracer provider and log subscriber setup.
use crate::config::{Config, ExporterKind};
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub(crate) fn resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_service_name(service_name.to_owned())
        .with_attribute(opentelemetry::KeyValue::new(
            SERVICE_VERSION,
            env!("CARGO_PKG_VERSION"),
        ))
        .build()
}

/// Builds the provider for the configured exporter. The caller owns it and
/// must shut it down so buffered spans are flushed.
pub(crate) fn init_tracer_provider(config: &Config) -> anyhow::Result<SdkTracerProvider> {
    let builder = SdkTracerProvider::builder().with_resource(resource(&config.service_name));

    let provider = match config.exporter {
        ExporterKind::Stdout => builder
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build(),
        ExporterKind::Otlp => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(config.otlp_endpoint.as_str())
                .build()?;
            builder.with_batch_exporter(exporter).build()
        }
        // A provider without processors still hands out real span contexts,
        // it just never exports them.
        ExporterKind::Disabled => builder.build(),
    };
    Ok(provider)
}

/// Logs go to stderr so they never interleave with the result or with
/// spans printed by the stdout exporter.
pub(crate) fn init_logging() -> anyhow::Result<()> {
    // Exporter internals are silenced, otherwise every failed OTLP
    // request would be logged by the HTTP stack as well.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?
        .add_directive("hyper=off".parse()?)
        .add_directive("reqwest=off".parse()?)
        .add_directive("opentelemetry=off".parse()?);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
