//! Shared ambient infrastructure for the task scheduler: logging
//! bootstrap and the Prometheus metrics sink.

pub mod logging;
pub mod metrics;

pub use metrics::PrometheusTaskMetrics;
