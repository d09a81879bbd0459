//! Application Services
//!
//! Long-running background work: the execution worker pool, the outbox
//! relay loop and the orchestrator that owns their lifecycle.

mod in_flight;
mod orchestrator;
mod outbox_relay;
mod worker_pool;

pub use in_flight::InFlightOrders;
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorError};
pub use outbox_relay::spawn_outbox_relay;
pub use worker_pool::{EnqueueError, Enqueued, ExecutionQueue, execution_queue, spawn_workers};
