// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Order Manager - Rust Core Library
//!
//! Accepts orders, executes them on an exchange through a bounded worker
//! pool, and publishes every lifecycle change to the event bus through a
//! transactional outbox.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Order aggregate, status state machine, outbox records
//! - **Application**: Ports, use cases (submit, execute, relay) and the
//!   long-running services (worker pool, relay loop, orchestrator)
//! - **Infrastructure**: Store, bus and exchange adapters plus the HTTP API
//!
//! # Delivery Guarantees
//!
//! An accepted order and its "OrderSubmitted" outbox row are written in one
//! transaction, as are terminal status changes and their outbox rows. The
//! relay publishes every row at least once; consumers deduplicate by
//! `eventId`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases, services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// YAML configuration with environment interpolation.
pub mod config;

/// Metrics and logging.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::services::{Orchestrator, OrchestratorConfig};
pub use domain::order_execution::{
    NewOrder, Order, OrderSide, OrderStateMachine, OrderStatus, OrderType,
};
pub use domain::outbox::{EventEnvelope, OutboxEvent};
