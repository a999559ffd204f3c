use opentelemetry::global;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
    Resource,
};
use std::sync::OnceLock;
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Initialize tracing/logging and (optionally) OpenTelemetry export.
///
/// - Always emits structured JSON logs via `tracing_subscriber`, filtered by `RUST_LOG`
///   (default `info`).
/// - Bridges `log` records into `tracing`.
/// - Exports spans over OTLP when `OTEL_EXPORTER_OTLP_ENDPOINT` (or the traces-specific
///   variant, or `OIDC_OTLP_ENDPOINT`) is set; otherwise a local provider still generates
///   trace/span IDs for log correlation.
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    // Bridge the app-specific variable onto the standard one the exporter reads.
    if non_empty_env("OTEL_EXPORTER_OTLP_ENDPOINT").is_none()
        && non_empty_env("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT").is_none()
    {
        if let Some(endpoint) = non_empty_env("OIDC_OTLP_ENDPOINT") {
            std::env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", endpoint);
        }
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // W3C trace-context for propagation (traceparent/tracestate).
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let otlp_endpoint_set = non_empty_env("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT").is_some()
        || non_empty_env("OTEL_EXPORTER_OTLP_ENDPOINT").is_some();

    let builder = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)));

    let provider = if otlp_endpoint_set {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()?;
        builder.with_batch_exporter(exporter).build()
    } else {
        builder.build()
    };

    let tracer = {
        use opentelemetry::trace::TracerProvider as _;
        provider.tracer(service_name.to_string())
    };
    global::set_tracer_provider(provider.clone());
    let _ = TRACER_PROVIDER.set(provider);

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    // Every event carries the active span stack, which holds trace_id/span_id.
    let formatting_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer)
        .with(formatting_layer)
        .try_init()?;

    // Ignore errors if a logger was already set (e.g., tests).
    let _ = tracing_log::LogTracer::init();

    Ok(())
}

/// Record OpenTelemetry trace/span identifiers onto a span.
///
/// The span must declare `trace_id` and `span_id` as empty fields.
pub fn annotate_span_with_trace_ids(span: &Span) {
    use opentelemetry::trace::TraceContextExt;
    use tracing_opentelemetry::OpenTelemetrySpanExt;
    let cx = span.context();
    let otel_span = cx.span();
    let sc = otel_span.span_context();
    if sc.is_valid() {
        span.record("trace_id", tracing::field::display(sc.trace_id()));
        span.record("span_id", tracing::field::display(sc.span_id()));
    }
}

/// Flush pending spans (when an exporter is installed).
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to shut down tracer provider: {e}");
        }
    }
}
