//! Observability module for metrics and logging.
//!
//! Prometheus export for the order pipeline and the `tracing` subscriber
//! setup used by the binary.

mod logging;
mod metrics;

pub use logging::{LoggingError, init_logging};
pub use metrics::{
    MetricsError, init_metrics, record_execution, record_publish, record_relay_cycle,
    record_submission, update_in_flight_orders, update_oldest_unprocessed_age,
};
