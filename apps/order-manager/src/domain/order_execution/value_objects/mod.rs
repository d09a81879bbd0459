//! Order Execution Value Objects

mod order_side;
mod order_status;
mod order_type;

pub use order_side::OrderSide;
pub use order_status::{OrderStatus, ParseOrderStatusError};
pub use order_type::OrderType;
