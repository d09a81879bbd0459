//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: The order and its invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Services**: The order status state machine
//! - **Outbox Records**: Durable "this must reach the bus" facts
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Order lifecycle from submission to a terminal status
//! - [`outbox`]: Events waiting to be relayed to the message bus

pub mod order_execution;
pub mod outbox;
pub mod shared;
