//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for the order store, event bus and exchange
//! - **Use Cases**: Submission, execution and one outbox relay cycle
//! - **Services**: The long-running worker pool, relay loop and orchestrator

pub mod ports;
pub mod services;
pub mod use_cases;

pub use ports::*;
pub use services::*;
pub use use_cases::*;
