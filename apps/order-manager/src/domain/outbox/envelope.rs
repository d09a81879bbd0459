//! Wire envelope for events published to the bus.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{OutboxEvent, OutboxEventId};
use crate::domain::shared::Timestamp;

/// The message body published for an outbox row.
///
/// The relay and the worker's immediate publish both send this envelope
/// built from the same row, so `event_id` identifies duplicates across the
/// two delivery paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Outbox row key.
    pub event_id: OutboxEventId,
    /// Entity the event concerns.
    pub aggregate_type: String,
    /// Identifier of that entity.
    pub aggregate_id: String,
    /// Symbolic event name.
    pub event_type: String,
    /// Aggregate snapshot.
    pub payload: Value,
    /// When the outbox row was created.
    pub occurred_at: Timestamp,
}

impl EventEnvelope {
    /// Serialize to the bytes handed to the publisher.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<&OutboxEvent> for EventEnvelope {
    fn from(event: &OutboxEvent) -> Self {
        Self {
            event_id: event.id,
            aggregate_type: event.aggregate_type.clone(),
            aggregate_id: event.aggregate_id.clone(),
            event_type: event.event_type.clone(),
            payload: event.payload.clone(),
            occurred_at: event.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_row_identity() {
        let event = OutboxEvent {
            id: OutboxEventId::new(3),
            aggregate_type: "Order".to_string(),
            aggregate_id: "O1".to_string(),
            event_type: "OrderCompleted".to_string(),
            payload: serde_json::json!({"id": "O1"}),
            processed: false,
            created_at: Timestamp::now(),
            processed_at: None,
        };

        let bytes = EventEnvelope::from(&event).to_bytes().unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["eventId"], 3);
        assert_eq!(json["aggregateId"], "O1");
        assert_eq!(json["eventType"], "OrderCompleted");
        assert_eq!(json["payload"]["id"], "O1");
    }
}
