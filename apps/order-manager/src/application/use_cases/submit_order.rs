//! Submit Order Use Case
//!
//! Validates an incoming order and writes it, together with its
//! "OrderSubmitted" outbox row, in one transaction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::ports::{OrderStorePort, StoreError};
use crate::domain::order_execution::{NewOrder, Order, OrderEventType};
use crate::domain::outbox::NewOutboxEvent;
use crate::domain::shared::Timestamp;
use crate::observability;

/// Category of a rejected submission, safe to show to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// Malformed order fields.
    InvalidOrder,
    /// An order with this id was already accepted.
    DuplicateOrder,
    /// The store could not complete the transaction.
    StorageUnavailable,
}

impl RejectionReason {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidOrder => "INVALID_ORDER",
            Self::DuplicateOrder => "DUPLICATE_ORDER",
            Self::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }
}

/// A submission that was not accepted. Nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejection {
    /// Validation failed before any write.
    #[error("invalid order: {message}")]
    InvalidOrder { message: String },

    /// The id is already taken.
    #[error("duplicate order id: {order_id}")]
    DuplicateOrder { order_id: String },

    /// The transaction failed.
    #[error("order store unavailable")]
    StorageUnavailable,
}

impl SubmitRejection {
    /// Reason category for callers.
    #[must_use]
    pub const fn reason(&self) -> RejectionReason {
        match self {
            Self::InvalidOrder { .. } => RejectionReason::InvalidOrder,
            Self::DuplicateOrder { .. } => RejectionReason::DuplicateOrder,
            Self::StorageUnavailable => RejectionReason::StorageUnavailable,
        }
    }
}

/// Use case for accepting orders.
pub struct SubmitOrderUseCase<S>
where
    S: OrderStorePort + ?Sized,
{
    store: Arc<S>,
}

impl<S> SubmitOrderUseCase<S>
where
    S: OrderStorePort + ?Sized,
{
    /// Create a new SubmitOrderUseCase.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validate and persist the order as PENDING with its outbox row.
    pub async fn execute(&self, new_order: NewOrder) -> Result<Order, SubmitRejection> {
        let result = self.accept(new_order).await;

        let outcome = match &result {
            Ok(_) => "accepted",
            Err(rejection) => match rejection.reason() {
                RejectionReason::InvalidOrder => "invalid_order",
                RejectionReason::DuplicateOrder => "duplicate_order",
                RejectionReason::StorageUnavailable => "storage_unavailable",
            },
        };
        observability::record_submission(outcome);

        result
    }

    async fn accept(&self, new_order: NewOrder) -> Result<Order, SubmitRejection> {
        let now = Timestamp::now();

        let order = Order::new(new_order, now).map_err(|e| {
            tracing::debug!(error = %e, "Rejected malformed order");
            SubmitRejection::InvalidOrder {
                message: e.to_string(),
            }
        })?;

        let event = NewOutboxEvent::for_order(&order, OrderEventType::OrderSubmitted, now)
            .map_err(|e| {
                tracing::error!(order_id = %order.id(), error = %e, "Failed to serialize order snapshot");
                SubmitRejection::StorageUnavailable
            })?;

        match self.store.create_order_and_outbox_event(&order, event).await {
            Ok(stored) => {
                tracing::info!(
                    order_id = %order.id(),
                    symbol = %order.symbol(),
                    side = %order.side(),
                    order_type = %order.order_type(),
                    quantity = %order.quantity(),
                    event_id = %stored.id,
                    "Order accepted"
                );
                Ok(order)
            }
            Err(StoreError::DuplicateOrderId { order_id }) => {
                tracing::info!(order_id = %order_id, "Rejected duplicate order id");
                Err(SubmitRejection::DuplicateOrder { order_id })
            }
            Err(e) => {
                tracing::error!(order_id = %order.id(), error = %e, "Failed to persist order");
                Err(SubmitRejection::StorageUnavailable)
            }
        }
    }
}
