//! Prometheus metrics for the order pipeline.
//!
//! Recording functions are plain calls into the `metrics` facade and are
//! no-ops until [`init_metrics`] installs the exporter.
//!
//! # Example
//!
//! ```ignore
//! use order_manager::observability::{init_metrics, record_submission};
//!
//! init_metrics("0.0.0.0:9090".parse()?)?;
//! record_submission("accepted");
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Latency buckets from 1ms to 10s.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
pub fn init_metrics(listen_addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .set_buckets(LATENCY_BUCKETS)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %listen_addr, "Prometheus metrics exporter started");

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Order Metrics
// ============================================================================

/// Record a submission outcome ("accepted", "invalid_order", ...).
pub fn record_submission(outcome: &str) {
    counter!("order_submissions_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a finished execution attempt and its duration.
pub fn record_execution(outcome: &str, elapsed: Duration) {
    counter!("order_executions_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("order_execution_seconds", "outcome" => outcome.to_string())
        .record(elapsed.as_secs_f64());
}

/// Update the number of orders queued or being executed.
pub fn update_in_flight_orders(count: usize) {
    gauge!("execution_in_flight_orders").set(count as f64);
}

// ============================================================================
// Outbox Metrics
// ============================================================================

/// Record a publish attempt.
///
/// `path` is "relay" or "immediate".
pub fn record_publish(path: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "outbox_publish_total",
        "path" => path.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record one relay cycle's duration.
pub fn record_relay_cycle(elapsed: Duration) {
    histogram!("outbox_relay_cycle_seconds").record(elapsed.as_secs_f64());
}

/// Age of the oldest unprocessed outbox row, zero when the outbox is drained.
///
/// A steadily growing value means a row is stuck.
pub fn update_oldest_unprocessed_age(age: Duration) {
    gauge!("outbox_oldest_unprocessed_age_seconds").set(age.as_secs_f64());
}
