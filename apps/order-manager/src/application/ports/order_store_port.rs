//! Order Store Port (Driven Port)
//!
//! Durable storage for orders and outbox rows. Methods that take both an
//! order and an outbox event write them in one transaction: either both
//! become visible or neither does.

use async_trait::async_trait;

use crate::domain::order_execution::{Order, OrderStatus};
use crate::domain::outbox::{NewOutboxEvent, OutboxEvent, OutboxEventId};
use crate::domain::shared::{OrderId, Timestamp};

/// Order store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No order with this id.
    #[error("Order not found: {order_id}")]
    NotFound { order_id: String },

    /// An order with this id already exists.
    #[error("Duplicate order ID: {order_id}")]
    DuplicateOrderId { order_id: String },

    /// No outbox row with this id.
    #[error("Outbox event not found: {event_id}")]
    EventNotFound { event_id: OutboxEventId },

    /// The store could not be reached or the transaction failed.
    #[error("Order store unavailable: {message}")]
    Unavailable { message: String },

    /// A stored row could not be decoded.
    #[error("Corrupt stored data: {message}")]
    Corrupt { message: String },
}

impl StoreError {
    pub(crate) fn unavailable(message: impl ToString) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    pub(crate) fn corrupt(message: impl ToString) -> Self {
        Self::Corrupt {
            message: message.to_string(),
        }
    }
}

/// Port for order and outbox persistence.
#[async_trait]
pub trait OrderStorePort: Send + Sync {
    /// Insert a new order and its outbox row atomically.
    ///
    /// Fails with [`StoreError::DuplicateOrderId`] if the id exists; nothing
    /// is written in that case.
    async fn create_order_and_outbox_event(
        &self,
        order: &Order,
        event: NewOutboxEvent,
    ) -> Result<OutboxEvent, StoreError>;

    /// Load an order by id.
    async fn get_order(&self, id: &OrderId) -> Result<Order, StoreError>;

    /// Overwrite an existing order row.
    async fn update_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Overwrite an existing order row and insert an outbox row atomically.
    async fn update_order_and_outbox_event(
        &self,
        order: &Order,
        event: NewOutboxEvent,
    ) -> Result<OutboxEvent, StoreError>;

    /// List orders newest first, optionally filtered by status.
    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError>;

    /// Fetch up to `limit` unprocessed outbox rows, oldest `created_at` first.
    async fn fetch_unprocessed_events(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError>;

    /// Mark an outbox row processed.
    ///
    /// Marking an already processed row keeps its original `processed_at`.
    async fn mark_event_processed(
        &self,
        id: OutboxEventId,
        processed_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// `created_at` of the oldest unprocessed outbox row, if any.
    async fn oldest_unprocessed_event_at(&self) -> Result<Option<Timestamp>, StoreError>;
}
