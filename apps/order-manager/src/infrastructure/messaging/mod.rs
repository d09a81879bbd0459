//! Messaging Adapters
//!
//! Implementations of [`EventPublisherPort`](crate::application::ports::EventPublisherPort).

pub mod in_memory;
#[cfg(feature = "kafka")]
pub mod kafka;

pub use in_memory::{DEFAULT_RETAINED_MESSAGES, InMemoryEventPublisher, PublishedMessage};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaEventPublisher, TopicStatus};
