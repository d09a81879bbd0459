//! Execute Order Use Case
//!
//! Drives one PENDING order through the exchange to a terminal status.
//!
//! The terminal status and its outbox row are written in one transaction, so
//! the outbox relay delivers the completion or failure even if the immediate
//! publish below is lost.

use std::sync::Arc;
use std::time::Instant;

use crate::application::ports::{
    EventPublisherPort, ExchangeError, ExchangePort, OrderStorePort, StoreError,
};
use crate::domain::order_execution::{
    Order, OrderError, OrderEventType, OrderStateMachine, OrderStatus,
};
use crate::domain::outbox::{EventEnvelope, NewOutboxEvent, OutboxEvent};
use crate::domain::shared::{ExchangeOrderId, OrderId, Timestamp};
use crate::observability;

/// How an execution request ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The exchange accepted the trade and the order is COMPLETED.
    Completed {
        /// Exchange-assigned id.
        exchange_order_id: ExchangeOrderId,
    },
    /// The order had already left PENDING; nothing was done.
    Skipped {
        /// Status found in the store.
        status: OrderStatus,
    },
}

/// Execution failure.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The exchange call failed; the order is now FAILED.
    #[error("order {order_id} failed on the exchange: {source}")]
    Exchange {
        order_id: String,
        #[source]
        source: ExchangeError,
    },

    /// A store read or write failed; the order keeps its last stored status.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A disallowed transition; nothing was written.
    #[error(transparent)]
    Transition(#[from] OrderError),

    /// The order snapshot could not be serialized.
    #[error("failed to serialize order snapshot: {0}")]
    Serialization(String),
}

/// Use case for executing a single order.
pub struct ExecuteOrderUseCase<S, X, P>
where
    S: OrderStorePort + ?Sized,
    X: ExchangePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    store: Arc<S>,
    exchange: Arc<X>,
    publisher: Arc<P>,
    events_topic: String,
}

impl<S, X, P> ExecuteOrderUseCase<S, X, P>
where
    S: OrderStorePort + ?Sized,
    X: ExchangePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    /// Create a new ExecuteOrderUseCase.
    pub fn new(
        store: Arc<S>,
        exchange: Arc<X>,
        publisher: Arc<P>,
        events_topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            exchange,
            publisher,
            events_topic: events_topic.into(),
        }
    }

    /// Execute the order with this id.
    ///
    /// Never retries the exchange call.
    pub async fn execute(&self, order_id: &OrderId) -> Result<ExecutionOutcome, ExecutionError> {
        let started = Instant::now();
        let result = self.run(order_id).await;

        let outcome = match &result {
            Ok(ExecutionOutcome::Completed { .. }) => "completed",
            Ok(ExecutionOutcome::Skipped { .. }) => "skipped",
            Err(ExecutionError::Exchange { .. }) => "failed",
            Err(_) => "error",
        };
        observability::record_execution(outcome, started.elapsed());

        result
    }

    async fn run(&self, order_id: &OrderId) -> Result<ExecutionOutcome, ExecutionError> {
        // Re-read: the queued id may be stale by the time a worker gets it.
        let mut order = self.store.get_order(order_id).await?;

        if !OrderStateMachine::can_transition(order.status(), OrderStatus::Executing) {
            tracing::info!(
                order_id = %order_id,
                status = %order.status(),
                "Order is no longer pending, skipping"
            );
            return Ok(ExecutionOutcome::Skipped {
                status: order.status(),
            });
        }

        order.start_execution(Timestamp::now())?;
        self.store.update_order(&order).await?;

        tracing::info!(
            order_id = %order_id,
            symbol = %order.symbol(),
            side = %order.side(),
            quantity = %order.quantity(),
            "Executing order"
        );

        match self.exchange.execute_trade(&order).await {
            Ok(ack) => {
                let now = Timestamp::now();
                order.complete(now)?;
                let stored = self
                    .persist_terminal(&order, OrderEventType::OrderCompleted, now)
                    .await?;

                tracing::info!(
                    order_id = %order_id,
                    exchange_order_id = %ack.exchange_order_id,
                    exchange_status = %ack.status,
                    "Order completed"
                );

                self.publish_immediately(&stored).await;

                Ok(ExecutionOutcome::Completed {
                    exchange_order_id: ack.exchange_order_id,
                })
            }
            Err(error) => {
                tracing::warn!(
                    order_id = %order_id,
                    error = %error,
                    "Exchange call failed, marking order failed"
                );

                let now = Timestamp::now();
                order.fail(now)?;
                self.persist_terminal(&order, OrderEventType::OrderFailed, now)
                    .await?;

                Err(ExecutionError::Exchange {
                    order_id: order_id.to_string(),
                    source: error,
                })
            }
        }
    }

    async fn persist_terminal(
        &self,
        order: &Order,
        event_type: OrderEventType,
        now: Timestamp,
    ) -> Result<OutboxEvent, ExecutionError> {
        let event = NewOutboxEvent::for_order(order, event_type, now)
            .map_err(|e| ExecutionError::Serialization(e.to_string()))?;
        Ok(self.store.update_order_and_outbox_event(order, event).await?)
    }

    /// Best-effort publish of a freshly written outbox row.
    ///
    /// Failures are only logged; the relay publishes the same row later.
    async fn publish_immediately(&self, event: &OutboxEvent) {
        let payload = match EventEnvelope::from(event).to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(event_id = %event.id, error = %e, "Failed to encode event envelope");
                return;
            }
        };

        match self
            .publisher
            .publish(&self.events_topic, &event.aggregate_id, &payload)
            .await
        {
            Ok(()) => {
                observability::record_publish("immediate", true);
                tracing::debug!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "Published event immediately"
                );
            }
            Err(e) => {
                observability::record_publish("immediate", false);
                tracing::warn!(
                    event_id = %event.id,
                    error = %e,
                    "Immediate publish failed, outbox relay will deliver"
                );
            }
        }
    }
}
