//! Telemetry initialization and configuration

use serde::Deserialize;
use std::sync::Once;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

pub type TelemetryError = Box<dyn std::error::Error + Send + Sync>;

/// Console output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

fn env_filter() -> Result<EnvFilter, TelemetryError> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?)
}

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .boxed(),
    }
}

/// Initialize console logging. Later calls are no-ops.
///
/// # Example
/// ```
/// use pts_telemetry::{LogFormat, init_telemetry};
/// init_telemetry("pointscale", LogFormat::Text).expect("Failed to initialize telemetry");
/// ```
pub fn init_telemetry(service_name: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let mut result: Result<(), TelemetryError> = Ok(());
    INIT.call_once(|| {
        result = (|| -> Result<(), TelemetryError> {
            tracing_subscriber::registry().with(fmt_layer(format)).with(env_filter()?).try_init()?;
            tracing::info!(service.name = service_name, "Telemetry initialized");
            Ok(())
        })();
    });
    result
}

/// Initialize console logging plus OTLP span export.
///
/// # Arguments
/// * `service_name` - reported as the `service.name` resource
/// * `endpoint` - OTLP collector endpoint (e.g., "http://localhost:4317")
///
/// # Example
/// ```no_run
/// use pts_telemetry::{LogFormat, init_with_otlp};
/// init_with_otlp("pointscale", "http://localhost:4317", LogFormat::Json)
///     .expect("Failed to initialize telemetry");
/// ```
pub fn init_with_otlp(
    service_name: &str,
    endpoint: &str,
    format: LogFormat,
) -> Result<(), TelemetryError> {
    use opentelemetry_otlp::WithExportConfig;
    use tracing_opentelemetry::OpenTelemetryLayer;

    let mut result: Result<(), TelemetryError> = Ok(());
    INIT.call_once(|| {
        result = (|| -> Result<(), TelemetryError> {
            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
                .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
                    opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                        "service.name",
                        service_name.to_string(),
                    )]),
                ))
                .install_batch(opentelemetry_sdk::runtime::Tokio)?;

            tracing_subscriber::registry()
                .with(fmt_layer(format))
                .with(OpenTelemetryLayer::new(tracer))
                .with(env_filter()?)
                .try_init()?;

            tracing::info!(
                service.name = service_name,
                otlp.endpoint = endpoint,
                "Telemetry initialized with OpenTelemetry"
            );
            Ok(())
        })();
    });
    result
}

/// Flush pending spans. Call before the process exits.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
