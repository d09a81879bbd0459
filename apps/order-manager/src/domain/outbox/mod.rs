//! Outbox Bounded Context
//!
//! An outbox row records that an event must reach the message bus. It is
//! written in the same transaction as the order change it describes and is
//! marked processed only after the publisher accepted it.

mod envelope;
mod outbox_event;

pub use envelope::EventEnvelope;
pub use outbox_event::{NewOutboxEvent, OutboxEvent, OutboxEventId};
