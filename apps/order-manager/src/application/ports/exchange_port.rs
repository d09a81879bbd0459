//! Exchange Port (Driven Port)
//!
//! Interface for executing trades on an external exchange.
//!
//! The core never retries a trade: a retried submission after a timeout may
//! result in a duplicate trade unless the exchange deduplicates by client
//! order id.

use async_trait::async_trait;

use crate::domain::order_execution::Order;
use crate::domain::shared::ExchangeOrderId;

/// Acknowledgment of an executed trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeAck {
    /// Exchange-assigned order id.
    pub exchange_order_id: ExchangeOrderId,
    /// Exchange-reported status, e.g. "FILLED".
    pub status: String,
}

/// Exchange error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The exchange refused the order.
    #[error("Trade rejected by exchange: {message}")]
    Rejected { code: Option<i64>, message: String },

    /// Credentials missing, wrong or lacking permission.
    #[error("Exchange authentication failed: {message}")]
    Unauthorized { message: String },

    /// No response within the client timeout.
    #[error("Exchange call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Network failure or exchange-side outage.
    #[error("Exchange unavailable: {message}")]
    Unavailable { message: String },

    /// The exchange answered with something we could not interpret.
    #[error("Invalid exchange response: {message}")]
    InvalidResponse { message: String },
}

impl ExchangeError {
    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Timeout { .. } => "timeout",
            Self::Unavailable { .. } => "unavailable",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }
}

/// Port for trade execution.
#[async_trait]
pub trait ExchangePort: Send + Sync {
    /// Execute a trade for `order`, bounded by the adapter's own timeout.
    async fn execute_trade(&self, order: &Order) -> Result<TradeAck, ExchangeError>;
}
