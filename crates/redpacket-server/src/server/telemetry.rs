//! # Telemetry Features
//!
//! Console logging through `tracing_subscriber::fmt` is always installed.
//! OpenTelemetry export is layered on top behind feature flags.
//!
//! ## Feature matrix
//!
//! - `tracing` (default): Enables engine/server events and OpenTelemetry
//!   spans.
//! - `metrics`: Enables OpenTelemetry metrics (packets created, claims, amount
//!   claimed, claim latency).
//! - `stdout`: Enables the stdout OpenTelemetry exporter.
//!
//! ## Span behavior
//!
//! - Spans created via `tracing::info_span!` or `#[instrument]` are exported to
//!   any enabled telemetry backend
//! - Events outside of a span are only shown in log output (via
//!   `fmt::layer()`), not exported
//!
//! ## Example usage
//!
//! ```bash
//! cargo run --features tracing,metrics,stdout
//! ```

// Disallow using `stdout` without `tracing` or `metrics`
#[cfg(all(feature = "stdout", not(any(feature = "tracing", feature = "metrics"))))]
compile_error!(
    "The 'stdout' feature requires at least one of 'tracing' or 'metrics' to be enabled."
);

use super::config::ServerConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics::SdkMeterProvider;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "tracing")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::SdkTracerProvider};

pub struct TelemetryProviders {
    #[cfg(feature = "tracing")]
    pub tracer_provider: SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every enabled provider.
    pub fn shutdown(self) {
        #[cfg(feature = "tracing")]
        {
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter provider: {err:#?}");
            }
        }
    }
}

/// Installs the global subscriber: console output always, OpenTelemetry
/// layers for whichever of `tracing` and `metrics` are enabled.
pub fn init_telemetry(_config: &ServerConfig) -> anyhow::Result<TelemetryProviders> {
    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let resource = service_resource(_config);
    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let scope = InstrumentationScope::builder("redpacket")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    let console = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .pretty();
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(console);

    #[cfg(feature = "tracing")]
    let (registry, tracer_provider) = {
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        let provider = tracer_provider(resource.clone());
        opentelemetry::global::set_tracer_provider(provider.clone());
        let layer = tracing_opentelemetry::layer()
            .with_tracer(provider.tracer_with_scope(scope.clone()))
            .with_error_records_to_exceptions(true);
        (registry.with(layer), provider)
    };

    #[cfg(feature = "metrics")]
    let (registry, meter_provider) = {
        let provider = meter_provider(resource);
        opentelemetry::global::set_meter_provider(provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        let _ = METRICS.set(PacketMetrics::new(&meter));
        let layer = tracing_opentelemetry::MetricsLayer::new(provider.clone());
        (registry.with(layer), provider)
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "tracing")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

/// Resource shared by spans and metrics, tagged with the shard count.
#[cfg(any(feature = "metrics", feature = "tracing"))]
fn service_resource(config: &ServerConfig) -> Resource {
    Resource::builder()
        .with_service_name("redpacket")
        .with_schema_url(
            [
                KeyValue::new(semvcns::resource::SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                KeyValue::new("redpacket.num_shards", config.service.num_shards as i64),
            ],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "tracing")]
fn tracer_provider(resource: Resource) -> SdkTracerProvider {
    let builder = SdkTracerProvider::builder().with_resource(resource);

    #[cfg(feature = "stdout")]
    let builder = builder.with_batch_exporter(opentelemetry_stdout::SpanExporter::default());

    builder.build()
}

#[cfg(feature = "metrics")]
fn meter_provider(resource: Resource) -> SdkMeterProvider {
    let builder = SdkMeterProvider::builder().with_resource(resource);

    #[cfg(feature = "stdout")]
    let builder = builder.with_periodic_exporter(opentelemetry_stdout::MetricExporter::default());

    builder.build()
}

#[cfg(feature = "metrics")]
static METRICS: OnceLock<PacketMetrics> = OnceLock::new();

#[cfg(feature = "metrics")]
struct PacketMetrics {
    packets_created: Counter<u64>,
    claims: Counter<u64>,
    empty_claims: Counter<u64>,
    claim_errors: Counter<u64>,
    amount_claimed: Counter<u64>,
    claim_duration: Histogram<f64>,
}

#[cfg(feature = "metrics")]
impl PacketMetrics {
    fn new(meter: &Meter) -> Self {
        Self {
            packets_created: meter
                .u64_counter("packets_created")
                .with_description("Red packets registered")
                .build(),
            claims: meter
                .u64_counter("claims")
                .with_description("Claims answered by a shard")
                .build(),
            empty_claims: meter
                .u64_counter("empty_claims")
                .with_description("Claims on unknown or exhausted packets")
                .build(),
            claim_errors: meter
                .u64_counter("claim_errors")
                .with_description("Claims that failed or timed out")
                .build(),
            amount_claimed: meter
                .u64_counter("amount_claimed")
                .with_unit("{minor_unit}")
                .with_description("Total amount handed out")
                .build(),
            claim_duration: meter
                .f64_histogram("claim_duration")
                .with_unit("ms")
                .with_description("Time from claim submission to shard reply")
                .build(),
        }
    }
}

// The recording functions below compile to no-ops without `metrics`.
#[cfg(feature = "metrics")]
pub fn increment_packets_created() {
    if let Some(metrics) = METRICS.get() {
        metrics.packets_created.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_packets_created() {}

#[cfg(feature = "metrics")]
pub fn record_claim(amount: u64) {
    let Some(metrics) = METRICS.get() else {
        return;
    };
    metrics.claims.add(1, &[]);
    if amount == 0 {
        metrics.empty_claims.add(1, &[]);
    } else {
        metrics.amount_claimed.add(amount, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_claim(_amount: u64) {}

#[cfg(feature = "metrics")]
pub fn increment_claim_errors() {
    if let Some(metrics) = METRICS.get() {
        metrics.claim_errors.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_claim_errors() {}

#[cfg(feature = "metrics")]
pub fn record_claim_duration(duration_ms: f64) {
    if let Some(metrics) = METRICS.get() {
        metrics.claim_duration.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_claim_duration(_duration_ms: f64) {}
