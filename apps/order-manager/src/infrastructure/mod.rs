//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - **Driven Adapters (Outbound)**
//!   - `persistence/`: Order store (in-memory, SQLite via Turso)
//!   - `messaging/`: Event bus publishers (in-memory, Kafka)
//!   - `exchange/`: Trade execution (simulated, Binance testnet)
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST API controllers

pub mod exchange;
pub mod http;
pub mod messaging;
pub mod persistence;
