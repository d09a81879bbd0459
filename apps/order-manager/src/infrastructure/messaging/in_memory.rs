//! In-memory event publisher.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{EventPublishError, EventPublisherPort};
use crate::domain::outbox::EventEnvelope;

/// A message accepted by [`InMemoryEventPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Destination topic.
    pub topic: String,
    /// Partition key.
    pub key: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    /// Decode the payload as an [`EventEnvelope`].
    pub fn envelope(&self) -> Result<EventEnvelope, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Messages kept by [`InMemoryEventPublisher::new`].
pub const DEFAULT_RETAINED_MESSAGES: usize = 10_000;

/// Publisher that keeps the most recent messages in memory.
///
/// Retention is bounded; once full, the oldest message is dropped for each
/// new one. Can be switched offline to simulate a bus outage; while offline
/// every publish fails immediately with a connection error.
#[derive(Debug)]
pub struct InMemoryEventPublisher {
    messages: Mutex<VecDeque<PublishedMessage>>,
    retain: usize,
    online: AtomicBool,
}

impl Default for InMemoryEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventPublisher {
    /// Create an online publisher keeping [`DEFAULT_RETAINED_MESSAGES`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAINED_MESSAGES)
    }

    /// Create an online publisher keeping at most `retain` messages.
    #[must_use]
    pub fn with_retention(retain: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            retain,
            online: AtomicBool::new(true),
        }
    }

    /// Bring the simulated bus up or down.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Retained messages, in publish order.
    #[must_use]
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().iter().cloned().collect()
    }

    /// Messages for one partition key.
    #[must_use]
    pub fn messages_for(&self, key: &str) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.key == key)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisherPort for InMemoryEventPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), EventPublishError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(EventPublishError::ConnectionError {
                message: "in-memory bus is offline".to_string(),
            });
        }

        let mut messages = self.messages.lock();
        if self.retain == 0 {
            return Ok(());
        }
        if messages.len() == self.retain {
            messages.pop_front();
        }
        messages.push_back(PublishedMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
