//! Order Execution Bounded Context
//!
//! Manages the order lifecycle from submission to a terminal status.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: Owns its status and enforces creation invariants
//! - **State Machine**: The four legal status transitions
//! - **Event Types**: The lifecycle facts that are relayed to the bus

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

pub use aggregate::{NewOrder, Order};
pub use errors::OrderError;
pub use events::OrderEventType;
pub use services::OrderStateMachine;
pub use value_objects::{OrderSide, OrderStatus, OrderType, ParseOrderStatusError};
