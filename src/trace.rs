use crate::logger::Logger;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Sampler;
use tracing_subscriber::{
    EnvFilter, fmt::format::FmtSpan, prelude::*, reload,
};

const DEFAULT_DIRECTIVES: &str = "info";

/// Installs the global subscriber: a reloadable `EnvFilter` (from
/// `RUST_LOG`, defaulting to `info`), a stderr formatter, and an
/// OpenTelemetry layer that exports over OTLP when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// The returned [`Logger`] controls the filter at runtime.
pub fn init_tracing(
    service_name: &'static str,
) -> anyhow::Result<(opentelemetry_sdk::trace::SdkTracerProvider, Logger)> {
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .filter(|s| !s.is_empty());

    let sampling_ratio = std::env::var("OTEL_TRACES_SAMPLER_RATE")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(1.0);

    // Follow the parent's sampling decision when there is one.
    let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
        sampling_ratio,
    )));
    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name)
        .build();

    let mut builder = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_sampler(sampler)
        .with_resource(resource);
    if let Some(endpoint) = otlp_endpoint {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()?;
        builder = builder.with_batch_exporter(exporter);
    }
    let tracer_provider = builder.build();

    opentelemetry::global::set_tracer_provider(tracer_provider.clone());
    let tracer = tracer_provider.tracer(service_name);

    let requested = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string());
    let (directives, filter) = match EnvFilter::try_new(&requested) {
        Ok(filter) => (requested, filter),
        Err(_) => (
            DEFAULT_DIRECTIVES.to_string(),
            EnvFilter::new(DEFAULT_DIRECTIVES),
        ),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
        )
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;

    let logger = Logger::with_reload_handle(directives, handle)?;
    Ok((tracer_provider, logger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::propagation::TextMapPropagator as _;

    // Installs the global subscriber, so this is the only test that calls
    // init_tracing.
    #[test]
    fn test_init_tracing_without_propagation() -> anyhow::Result<()> {
        let (_provider, logger) = init_tracing("memberd-test")?;

        let fields = opentelemetry::global::get_text_map_propagator(
            |propagator| propagator.fields().count(),
        );
        assert_eq!(fields, 0);
        assert!(!logger.directives().is_empty());
        Ok(())
    }
}
