//! Exchange Adapters
//!
//! Implementations of [`ExchangePort`](crate::application::ports::ExchangePort).

pub mod binance;
pub mod simulated;

pub use binance::{BinanceError, BinanceTestnetClient};
pub use simulated::SimulatedExchange;
