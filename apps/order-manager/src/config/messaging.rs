//! Event bus configuration.

use serde::{Deserialize, Serialize};

/// Which event publisher adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherBackend {
    /// Records messages in memory.
    #[default]
    Memory,
    /// Kafka producer.
    Kafka,
}

/// Messaging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Publisher backend.
    #[serde(default)]
    pub backend: PublisherBackend,
    /// Kafka bootstrap servers.
    #[serde(default)]
    pub brokers: Vec<String>,
    /// Topic receiving order lifecycle events.
    #[serde(default = "default_events_topic")]
    pub events_topic: String,
    /// Upper bound on a single send, in milliseconds.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Partitions for the events topic when it is created at startup.
    #[serde(default = "default_topic_partitions")]
    pub topic_partitions: i32,
    /// Replication factor for the events topic when it is created at startup.
    #[serde(default = "default_topic_replication")]
    pub topic_replication: i32,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            backend: PublisherBackend::default(),
            brokers: Vec::new(),
            events_topic: default_events_topic(),
            send_timeout_ms: default_send_timeout_ms(),
            topic_partitions: default_topic_partitions(),
            topic_replication: default_topic_replication(),
        }
    }
}

fn default_events_topic() -> String {
    "order-events".to_string()
}

const fn default_send_timeout_ms() -> u64 {
    5000
}

const fn default_topic_partitions() -> i32 {
    3
}

const fn default_topic_replication() -> i32 {
    1
}
