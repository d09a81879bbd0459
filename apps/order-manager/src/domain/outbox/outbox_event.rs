//! Outbox event records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::order_execution::events::ORDER_AGGREGATE_TYPE;
use crate::domain::order_execution::{Order, OrderEventType};
use crate::domain::shared::Timestamp;

/// Store-assigned, monotonically increasing outbox row key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboxEventId(i64);

impl OutboxEventId {
    /// Wrap a raw key.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw key value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for OutboxEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outbox row that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxEvent {
    /// Entity the event concerns, e.g. "Order".
    pub aggregate_type: String,
    /// Identifier of that entity; also the bus partition key.
    pub aggregate_id: String,
    /// Symbolic event name.
    pub event_type: String,
    /// Snapshot of the aggregate when the event was created.
    pub payload: Value,
    /// Relay ordering key.
    pub created_at: Timestamp,
}

impl NewOutboxEvent {
    /// Build the outbox row announcing `order` in its current state.
    pub fn for_order(
        order: &Order,
        event_type: OrderEventType,
        created_at: Timestamp,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            aggregate_type: ORDER_AGGREGATE_TYPE.to_string(),
            aggregate_id: order.id().to_string(),
            event_type: event_type.as_str().to_string(),
            payload: serde_json::to_value(order)?,
            created_at,
        })
    }

    /// Attach the store-assigned key, producing an unprocessed row.
    #[must_use]
    pub fn into_stored(self, id: OutboxEventId) -> OutboxEvent {
        OutboxEvent {
            id,
            aggregate_type: self.aggregate_type,
            aggregate_id: self.aggregate_id,
            event_type: self.event_type,
            payload: self.payload,
            processed: false,
            created_at: self.created_at,
            processed_at: None,
        }
    }
}

/// A stored outbox row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEvent {
    /// Store-assigned key.
    pub id: OutboxEventId,
    /// Entity the event concerns.
    pub aggregate_type: String,
    /// Identifier of that entity.
    pub aggregate_id: String,
    /// Symbolic event name.
    pub event_type: String,
    /// Opaque payload.
    pub payload: Value,
    /// Whether the publisher accepted the event.
    pub processed: bool,
    /// Relay ordering key.
    pub created_at: Timestamp,
    /// When the row was marked processed.
    pub processed_at: Option<Timestamp>,
}
