//! Execution worker pool configuration.

use serde::{Deserialize, Serialize};

/// Execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of concurrent execution workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Capacity of the execution queue; a full queue blocks submission.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Re-enqueue PENDING orders found in the store at start.
    #[serde(default = "default_true")]
    pub recover_pending_on_start: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            recover_pending_on_start: true,
        }
    }
}

const fn default_worker_count() -> usize {
    3
}

const fn default_queue_capacity() -> usize {
    100
}

pub(crate) const fn default_true() -> bool {
    true
}
