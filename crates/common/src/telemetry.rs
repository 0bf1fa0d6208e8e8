use crate::Environment;
use crate::logging::{env_filter, fmt_layer, setup_logging};
use anyhow::Context;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::attribute::{SERVICE_NAME, SERVICE_VERSION};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the OTLP collector endpoint.
pub const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

const METRIC_EXPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Owns the OTLP tracer and meter providers and flushes them on drop.
///
/// The batch exporters run on a Tokio runtime. Synchronous binaries use
/// [`TelemetryGuard::init_with_runtime`], which keeps a small runtime alive for
/// as long as the guard.
///
/// # Example
/// ```ignore
/// let _telemetry = TelemetryGuard::init_with_runtime("controller", "http://localhost:4317", Environment::Production)?;
/// // ... detection loop runs ...
/// // Spans and metrics are flushed when the guard is dropped
/// ```
pub struct TelemetryGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    // Dropped after the providers are shut down in `Drop`.
    _runtime: Option<Runtime>,
}

impl TelemetryGuard {
    /// Initialize OTLP export and install the tracing subscriber (in place of
    /// `setup_logging`). Must be called from within a Tokio runtime.
    pub fn init(
        service_name: &str,
        endpoint: &str,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let resource = service_resource(service_name);

        let tracer_provider = build_tracer_provider(endpoint, resource.clone())?;
        global::set_tracer_provider(tracer_provider.clone());

        let meter_provider = build_meter_provider(endpoint, resource)?;
        global::set_meter_provider(meter_provider.clone());

        let otel_layer =
            tracing_opentelemetry::layer().with_tracer(global::tracer(service_name.to_string()));

        tracing_subscriber::registry()
            .with(env_filter())
            .with(otel_layer)
            .with(fmt_layer(environment))
            .init();

        Ok(Self {
            tracer_provider,
            meter_provider,
            _runtime: None,
        })
    }

    /// Like [`TelemetryGuard::init`], for callers without a runtime of their own.
    pub fn init_with_runtime(
        service_name: &str,
        endpoint: &str,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("otel-export")
            .enable_all()
            .build()
            .context("Failed to create Tokio runtime for telemetry")?;

        let mut guard =
            runtime.block_on(async { Self::init(service_name, endpoint, environment) })?;
        guard._runtime = Some(runtime);
        Ok(guard)
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shutdown tracer provider: {:?}", e);
        }
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("Failed to shutdown meter provider: {:?}", e);
        }
    }
}

/// Install logging for a service: OTLP traces and metrics when `endpoint` is
/// set, plain `tracing` output otherwise. Keep the returned guard alive.
pub fn init_observability(
    service_name: &str,
    endpoint: Option<&str>,
    environment: Environment,
) -> anyhow::Result<Option<TelemetryGuard>> {
    match endpoint {
        Some(endpoint) => {
            let guard = TelemetryGuard::init_with_runtime(service_name, endpoint, environment)?;
            tracing::info!(endpoint, "OpenTelemetry export enabled");
            Ok(Some(guard))
        }
        None => {
            setup_logging(environment);
            Ok(None)
        }
    }
}

fn service_resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

fn build_tracer_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to build OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        .with_batch_exporter(exporter)
        .build())
}

fn build_meter_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to build OTLP metric exporter")?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(METRIC_EXPORT_INTERVAL)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

/// Creates an info-level span and enters it.
#[macro_export]
macro_rules! span {
    ($name:literal) => {
        tracing::info_span!($name).entered()
    };
}

/// Creates a debug-level span and enters it.
#[macro_export]
macro_rules! span_debug {
    ($name:literal) => {
        tracing::debug_span!($name).entered()
    };
}
