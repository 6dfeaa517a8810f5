// Structured logging, OpenTelemetry tracing and Prometheus metrics

use anyhow::Result;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const SERVICE_NAME: &str = "twogether";

pub const AUTH_LOGIN_TOTAL: &str = "auth_login_total";
pub const AUTH_REFRESH_TOTAL: &str = "auth_refresh_total";
pub const UPLOAD_BYTES_TOTAL: &str = "upload_bytes_total";
pub const TOUR_API_REQUESTS_TOTAL: &str = "tour_api_requests_total";

/// Initialize JSON logging with span context.
///
/// `RUST_LOG` wins over `log_level`. When `tracing_endpoint` is set, spans
/// are also exported over OTLP.
#[tracing::instrument(skip_all)]
pub fn init_logging(log_level: &str, tracing_endpoint: Option<&str>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    let registry = tracing_subscriber::registry().with(json_layer);

    if let Some(endpoint) = tracing_endpoint {
        let tracer = init_tracer(endpoint)?;
        let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        registry
            .with(telemetry_layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;
    } else {
        registry
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;
    }

    tracing::info!(
        log_level = log_level,
        tracing_endpoint = tracing_endpoint,
        "Structured logging initialized"
    );

    Ok(())
}

#[tracing::instrument(skip_all)]
fn init_tracer(endpoint: &str) -> Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry_sdk::runtime::Tokio;

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .build_span_exporter()
        .map_err(|e| anyhow::anyhow!("Failed to build span exporter: {}", e))?;

    let tracer_provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", SERVICE_NAME),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])),
        )
        .build();

    global::set_tracer_provider(tracer_provider.clone());
    let tracer = tracer_provider.tracer(SERVICE_NAME);

    tracing::info!(endpoint = endpoint, "OpenTelemetry OTLP exporter initialized");
    Ok(tracer)
}

/// Flush remaining spans on shutdown
pub fn shutdown_tracer() {
    global::shutdown_tracer_provider();
}

/// Install the global Prometheus recorder.
///
/// The returned handle renders the text exposition served at `/metrics`.
#[tracing::instrument(skip_all)]
pub fn install_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    describe_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(AUTH_LOGIN_TOTAL, "Login attempts by outcome");
    describe_counter!(AUTH_REFRESH_TOTAL, "Refresh token exchanges by outcome");
    describe_counter!(
        UPLOAD_BYTES_TOTAL,
        metrics::Unit::Bytes,
        "Bytes written to object storage by key prefix"
    );
    describe_counter!(
        TOUR_API_REQUESTS_TOTAL,
        "Open-data API requests by operation and outcome"
    );
}

/// `outcome` is one of `success`, `invalid_credentials`, `deleted`
#[inline]
pub fn record_login(outcome: &'static str) {
    counter!(AUTH_LOGIN_TOTAL, "outcome" => outcome).increment(1);
}

/// `outcome` is one of `success`, `invalid`, `expired`, `reused`
#[inline]
pub fn record_token_refresh(outcome: &'static str) {
    counter!(AUTH_REFRESH_TOTAL, "outcome" => outcome).increment(1);
}

#[inline]
pub fn record_upload(prefix: &'static str, bytes: u64) {
    counter!(UPLOAD_BYTES_TOTAL, "prefix" => prefix).increment(bytes);
}

#[inline]
pub fn record_tour_api_request(operation: &'static str, outcome: &'static str) {
    counter!(
        TOUR_API_REQUESTS_TOTAL,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
