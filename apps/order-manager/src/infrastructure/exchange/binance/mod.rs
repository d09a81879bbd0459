//! Binance Spot Testnet Adapter
//!
//! Places orders through the signed REST endpoint `POST /api/v3/order`.

mod client;
mod error;
mod signer;

pub use client::BinanceTestnetClient;
pub use error::BinanceError;
pub use signer::BinanceSigner;
