//! Logging initialization.

use tracing::info;
use tracing_subscriber::{Layer, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    /// Name reported in the startup line.
    pub service_name: String,
    /// Emit JSON instead of the compact human format.
    pub json_format: bool,
}

impl LoggerConfig {
    pub fn with_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            json_format: false,
        }
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// Defaults to INFO and can be overridden via `RUST_LOG`.
pub fn init(config: LoggerConfig) {
    let filt = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    let stdout_sub = if config.json_format {
        layer().json().with_filter(filt).boxed()
    } else {
        layer().compact().with_filter(filt).boxed()
    };

    tracing_subscriber::registry().with(stdout_sub).init();

    info!(service_name = %config.service_name, "logging initialized");
}
