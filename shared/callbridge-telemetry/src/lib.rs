//! Callbridge Telemetry
//!
//! Structured logging setup and in-process metric primitives.

mod config;
mod metrics;
mod tracing_setup;

pub use config::{LogFormat, TelemetryConfig};
pub use metrics::{Counter, Gauge, Histogram, MetricSnapshot, DEFAULT_WINDOW};
pub use tracing_setup::init_tracing;

/// Install logging for `service_name` as configured by the environment
pub fn init(service_name: &str) -> Result<(), TelemetryError> {
    init_tracing(&TelemetryConfig::from_env(service_name))
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("logging setup failed: {0}")]
    TracingInit(String),
}
