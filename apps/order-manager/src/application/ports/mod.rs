//! Application Ports (Driven)
//!
//! Interfaces the core requires of external systems. Adapters live in
//! `infrastructure`.

mod event_publisher_port;
mod exchange_port;
mod order_store_port;

pub use event_publisher_port::{EventPublishError, EventPublisherPort};
pub use exchange_port::{ExchangeError, ExchangePort, TradeAck};
pub use order_store_port::{OrderStorePort, StoreError};
