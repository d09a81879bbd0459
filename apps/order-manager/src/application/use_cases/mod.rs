//! Application Use Cases
//!
//! Each use case performs one unit of work against the ports. The
//! long-running loops in `services` call them.

mod execute_order;
mod relay_outbox;
mod submit_order;

pub use execute_order::{ExecuteOrderUseCase, ExecutionError, ExecutionOutcome};
pub use relay_outbox::{RelayCycleReport, RelayOutboxUseCase};
pub use submit_order::{RejectionReason, SubmitOrderUseCase, SubmitRejection};
