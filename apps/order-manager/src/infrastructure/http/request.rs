//! HTTP request DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::{NewOrder, OrderSide, OrderType};
use crate::domain::shared::{OrderId, Symbol};

/// Default page size for order listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;
/// Largest page size honored for order listings.
pub const MAX_LIST_LIMIT: usize = 500;

/// Body of `POST /api/v1/orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Caller-chosen order id.
    pub id: String,
    /// Instrument, e.g. "BTCUSDT".
    pub symbol: String,
    /// "BUY" or "SELL".
    pub side: String,
    /// "MARKET" or "LIMIT".
    #[serde(rename = "type")]
    pub order_type: String,
    /// Quantity, as a number or a decimal string.
    pub quantity: Decimal,
    /// Limit price; required for LIMIT orders.
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl CreateOrderRequest {
    /// Convert to domain fields. Only the enum values are checked here; the
    /// remaining rules belong to the domain.
    pub fn into_new_order(self) -> Result<NewOrder, String> {
        let side = OrderSide::parse(&self.side.trim().to_ascii_uppercase())
            .ok_or_else(|| format!("side must be BUY or SELL, got '{}'", self.side))?;
        let order_type = OrderType::parse(&self.order_type.trim().to_ascii_uppercase())
            .ok_or_else(|| format!("type must be MARKET or LIMIT, got '{}'", self.order_type))?;

        Ok(NewOrder {
            id: OrderId::new(self.id),
            symbol: Symbol::new(self.symbol),
            side,
            order_type,
            quantity: self.quantity,
            price: self.price,
        })
    }
}

/// Query of `GET /api/v1/orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    /// Status filter, case-insensitive.
    #[serde(default)]
    pub status: Option<String>,
    /// Page size; defaults to [`DEFAULT_LIST_LIMIT`], capped at
    /// [`MAX_LIST_LIMIT`].
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ListOrdersQuery {
    /// Effective page size.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_lowercase_enums_and_numeric_quantity() {
        let request: CreateOrderRequest = serde_json::from_str(
            r#"{"id":"O1","symbol":"btcusdt","side":"buy","type":"limit","quantity":0.5,"price":"100.25"}"#,
        )
        .unwrap();

        let order = request.into_new_order().unwrap();

        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.quantity, dec!(0.5));
        assert_eq!(order.price, Some(dec!(100.25)));
        assert_eq!(order.symbol.as_str(), "BTCUSDT");
    }

    #[test]
    fn unknown_side_is_reported() {
        let request = CreateOrderRequest {
            id: "O1".to_string(),
            symbol: "BTCUSDT".to_string(),
            side: "HOLD".to_string(),
            order_type: "MARKET".to_string(),
            quantity: dec!(1),
            price: None,
        };

        assert!(request.into_new_order().unwrap_err().contains("HOLD"));
    }

    #[test]
    fn list_limit_defaults_and_caps() {
        assert_eq!(ListOrdersQuery::default().effective_limit(), DEFAULT_LIST_LIMIT);
        let huge = ListOrdersQuery {
            status: None,
            limit: Some(10_000),
        };
        assert_eq!(huge.effective_limit(), MAX_LIST_LIMIT);
    }
}
