//! HTTP/REST API adapter.
//!
//! Inbound adapter exposing order submission and the read path.

mod controller;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use request::*;
pub use response::*;
