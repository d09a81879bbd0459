//! HTTP response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::Order;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Application version.
    pub version: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable category, e.g. `DUPLICATE_ORDER`.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

impl ErrorResponse {
    /// Build an error body.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Order listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    /// Orders, newest first.
    pub orders: Vec<Order>,
    /// Number of orders returned.
    pub count: usize,
}
