//! Event Publisher Port (Driven Port)
//!
//! Interface for sending events to the message bus.

use async_trait::async_trait;

/// Event publishing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventPublishError {
    /// Connection error.
    #[error("Event publish connection error: {message}")]
    ConnectionError { message: String },

    /// The bus did not acknowledge in time.
    #[error("Event publish timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Serialization error.
    #[error("Event serialization error: {message}")]
    SerializationError { message: String },

    /// Publishing failed.
    #[error("Event publish failed: {message}")]
    PublishFailed { message: String },
}

/// Port for publishing events to the bus.
///
/// Implementations must return within a bounded time; a send that cannot be
/// acknowledged is reported as an error, never left pending.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publish `payload` to `topic`, partitioned by `key`.
    async fn publish(&self, topic: &str, key: &str, payload: &[u8])
    -> Result<(), EventPublishError>;
}
