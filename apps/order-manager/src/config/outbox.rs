//! Outbox relay configuration.

use serde::{Deserialize, Serialize};

/// What wakes the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayTrigger {
    /// Fixed-interval polling only.
    #[default]
    Poll,
    /// Polling plus an immediate wake-up after each accepted submission.
    Notify,
}

/// Outbox relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Relay interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum rows fetched per cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Relay wake-up strategy.
    #[serde(default)]
    pub trigger: RelayTrigger,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            trigger: RelayTrigger::default(),
        }
    }
}

const fn default_poll_interval_ms() -> u64 {
    500
}

const fn default_batch_size() -> usize {
    100
}
