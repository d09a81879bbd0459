//! Order Aggregate Root
//!
//! The Order aggregate validates its creation invariants and owns its status.
//! Every status change goes through [`OrderStateMachine`] and refreshes
//! `updated_at`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{OrderSide, OrderStatus, OrderType};
use crate::domain::shared::{OrderId, Symbol, Timestamp};

/// Parameters for reconstituting an Order from storage.
#[derive(Debug, Clone)]
pub struct ReconstitutedOrderParams {
    /// Order identifier.
    pub id: OrderId,
    /// Symbol being traded.
    pub symbol: Symbol,
    /// Order side (buy/sell).
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Total quantity.
    pub quantity: Decimal,
    /// Limit price, zero for market orders.
    pub price: Decimal,
    /// Current order status.
    pub status: OrderStatus,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
}

/// Fields of an incoming order, before validation.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Caller-supplied identifier.
    pub id: OrderId,
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity to trade.
    pub quantity: Decimal,
    /// Limit price. Required for LIMIT, ignored for MARKET.
    pub price: Option<Decimal>,
}

impl NewOrder {
    /// Validate the order fields.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.id.is_blank() {
            return Err(OrderError::invalid("id", "must not be empty"));
        }

        if self.symbol.is_empty() {
            return Err(OrderError::invalid("symbol", "must not be empty"));
        }

        if self.quantity <= Decimal::ZERO {
            return Err(OrderError::invalid(
                "quantity",
                format!("must be positive, got {}", self.quantity),
            ));
        }

        if self.order_type.requires_price() {
            match self.price {
                None => {
                    return Err(OrderError::invalid(
                        "price",
                        "required for limit orders",
                    ));
                }
                Some(price) if price <= Decimal::ZERO => {
                    return Err(OrderError::invalid(
                        "price",
                        format!("must be positive, got {price}"),
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// Order Aggregate Root.
///
/// Serializes to the JSON snapshot carried in outbox payloads.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    symbol: Symbol,
    side: OrderSide,
    #[serde(rename = "type")]
    order_type: OrderType,
    quantity: Decimal,
    price: Decimal,
    status: OrderStatus,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Order {
    /// Create a PENDING order from validated fields.
    pub fn new(new_order: NewOrder, now: Timestamp) -> Result<Self, OrderError> {
        new_order.validate()?;

        let price = if new_order.order_type.requires_price() {
            new_order.price.unwrap_or_default()
        } else {
            Decimal::ZERO
        };

        Ok(Self {
            id: new_order.id,
            symbol: new_order.symbol,
            side: new_order.side,
            order_type: new_order.order_type,
            quantity: new_order.quantity,
            price,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute an order from stored state.
    #[must_use]
    pub fn reconstitute(params: ReconstitutedOrderParams) -> Self {
        Self {
            id: params.id,
            symbol: params.symbol,
            side: params.side,
            order_type: params.order_type,
            quantity: params.quantity,
            price: params.price,
            status: params.status,
            created_at: params.created_at,
            updated_at: params.updated_at,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get the order ID.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Get the symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get the order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Get the order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Get the quantity.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Get the price (zero for market orders).
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Get the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Move to `target`, refreshing `updated_at`.
    ///
    /// Leaves the order untouched when the edge is not allowed.
    pub fn transition_to(&mut self, target: OrderStatus, now: Timestamp) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, target)?;
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    /// PENDING -> EXECUTING.
    pub fn start_execution(&mut self, now: Timestamp) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Executing, now)
    }

    /// EXECUTING -> COMPLETED.
    pub fn complete(&mut self, now: Timestamp) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Completed, now)
    }

    /// PENDING or EXECUTING -> FAILED.
    pub fn fail(&mut self, now: Timestamp) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Failed, now)
    }
}
