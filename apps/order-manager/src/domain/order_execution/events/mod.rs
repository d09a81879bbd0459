//! Order lifecycle event types.
//!
//! Each event type names a fact that is written to the outbox alongside the
//! order row that records it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value_objects::OrderStatus;

/// Aggregate type recorded on every order event.
pub const ORDER_AGGREGATE_TYPE: &str = "Order";

/// Symbolic name of an order lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderEventType {
    /// Order accepted and persisted as PENDING.
    OrderSubmitted,
    /// Exchange accepted the trade.
    OrderCompleted,
    /// Exchange rejected the trade or the call failed.
    OrderFailed,
}

impl OrderEventType {
    /// Get the event type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrderSubmitted => "OrderSubmitted",
            Self::OrderCompleted => "OrderCompleted",
            Self::OrderFailed => "OrderFailed",
        }
    }

    /// Event announcing that an order reached `status`, if there is one.
    #[must_use]
    pub const fn for_status(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Pending => Some(Self::OrderSubmitted),
            OrderStatus::Completed => Some(Self::OrderCompleted),
            OrderStatus::Failed => Some(Self::OrderFailed),
            OrderStatus::Executing => None,
        }
    }
}

impl fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
