//! Orchestrator
//!
//! Lifecycle object tying the submission path, the worker pool and the outbox
//! relay to one cancellation token and one task tracker. Built once by the
//! entry point and shared behind an `Arc`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::{
    EnqueueError, Enqueued, ExecutionQueue, InFlightOrders, execution_queue, spawn_outbox_relay,
    spawn_workers,
};
use crate::application::ports::{EventPublisherPort, ExchangePort, OrderStorePort};
use crate::application::use_cases::{
    ExecuteOrderUseCase, RelayOutboxUseCase, SubmitOrderUseCase, SubmitRejection,
};
use crate::config::{Config, RelayTrigger};
use crate::domain::order_execution::{NewOrder, Order, OrderStatus};
use crate::domain::shared::OrderId;

/// Recovery scans at most this many queue-fulls of PENDING orders per start.
const RECOVERY_SCAN_FACTOR: usize = 10;

/// Settings for the worker pool and relay.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Number of execution workers.
    pub worker_count: usize,
    /// Execution queue capacity.
    pub queue_capacity: usize,
    /// Relay interval.
    pub poll_interval: Duration,
    /// Rows per relay cycle.
    pub batch_size: usize,
    /// Relay wake-up strategy.
    pub trigger: RelayTrigger,
    /// Topic for order events.
    pub events_topic: String,
    /// Re-enqueue PENDING orders at start.
    pub recover_pending_on_start: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl OrchestratorConfig {
    /// Build from the application configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            worker_count: config.execution.worker_count,
            queue_capacity: config.execution.queue_capacity,
            poll_interval: config.outbox.poll_interval(),
            batch_size: config.outbox.batch_size,
            trigger: config.outbox.trigger,
            events_topic: config.messaging.events_topic.clone(),
            recover_pending_on_start: config.execution.recover_pending_on_start,
        }
    }

    /// Reject values the pool and the relay cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConfig`] naming the first zero
    /// field.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        let zero = if self.worker_count == 0 {
            Some("worker_count")
        } else if self.queue_capacity == 0 {
            Some("queue_capacity")
        } else if self.poll_interval.is_zero() {
            Some("poll_interval")
        } else if self.batch_size == 0 {
            Some("batch_size")
        } else {
            None
        };
        match zero {
            Some(field) => Err(OrchestratorError::InvalidConfig { field }),
            None => Ok(()),
        }
    }
}

/// Lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    /// `start` was already called.
    #[error("orchestrator already started")]
    AlreadyStarted,
    /// `stop` was already called.
    #[error("orchestrator stopped")]
    Stopped,
    /// A setting is zero.
    #[error("invalid orchestrator config: {field} must be positive")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
    },
}

/// Owns the worker pool, the relay loop and their shutdown.
pub struct Orchestrator<S, X, P>
where
    S: OrderStorePort + ?Sized,
    X: ExchangePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    store: Arc<S>,
    submit: SubmitOrderUseCase<S>,
    execute: Arc<ExecuteOrderUseCase<S, X, P>>,
    relay: Arc<RelayOutboxUseCase<S, P>>,
    queue: ExecutionQueue,
    receiver: parking_lot::Mutex<Option<mpsc::Receiver<OrderId>>>,
    in_flight: Arc<InFlightOrders>,
    relay_wake: Arc<Notify>,
    config: OrchestratorConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl<S, X, P> Orchestrator<S, X, P>
where
    S: OrderStorePort + ?Sized + 'static,
    X: ExchangePort + ?Sized + 'static,
    P: EventPublisherPort + ?Sized + 'static,
{
    /// Wire the use cases around the given adapters. Nothing runs until
    /// [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConfig`] if a worker count, queue
    /// capacity, poll interval or batch size is zero.
    pub fn new(
        store: Arc<S>,
        exchange: Arc<X>,
        publisher: Arc<P>,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let in_flight = Arc::new(InFlightOrders::new());
        let (queue, receiver) = execution_queue(config.queue_capacity, Arc::clone(&in_flight));

        let submit = SubmitOrderUseCase::new(Arc::clone(&store));
        let execute = Arc::new(ExecuteOrderUseCase::new(
            Arc::clone(&store),
            exchange,
            Arc::clone(&publisher),
            config.events_topic.clone(),
        ));
        let relay = Arc::new(RelayOutboxUseCase::new(
            Arc::clone(&store),
            publisher,
            config.events_topic.clone(),
            config.batch_size,
        ));

        Ok(Self {
            store,
            submit,
            execute,
            relay,
            queue,
            receiver: parking_lot::Mutex::new(Some(receiver)),
            in_flight,
            relay_wake: Arc::new(Notify::new()),
            config,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    /// Spawn the workers, the relay loop and, if enabled, PENDING recovery.
    ///
    /// # Errors
    ///
    /// Fails if already started or stopped.
    pub fn start(&self) -> Result<(), OrchestratorError> {
        if self.shutdown.is_cancelled() {
            return Err(OrchestratorError::Stopped);
        }
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(OrchestratorError::AlreadyStarted)?;

        spawn_workers(
            self.config.worker_count,
            receiver,
            Arc::clone(&self.execute),
            Arc::clone(&self.in_flight),
            &self.shutdown,
            &self.tracker,
        );

        let wake = match self.config.trigger {
            RelayTrigger::Poll => None,
            RelayTrigger::Notify => Some(Arc::clone(&self.relay_wake)),
        };
        spawn_outbox_relay(
            Arc::clone(&self.relay),
            self.config.poll_interval,
            wake,
            &self.shutdown,
            &self.tracker,
        );

        if self.config.recover_pending_on_start {
            self.tracker.spawn(recover_orders(
                Arc::clone(&self.store),
                self.queue.clone(),
                self.config.queue_capacity.saturating_mul(RECOVERY_SCAN_FACTOR),
                self.shutdown.clone(),
            ));
        }

        tracing::info!(
            workers = self.config.worker_count,
            queue_capacity = self.config.queue_capacity,
            trigger = ?self.config.trigger,
            "Orchestrator started"
        );
        Ok(())
    }

    /// Cancel the workers and the relay and wait until all of them exited.
    ///
    /// Work already in progress finishes first. Calling it again is a no-op.
    pub async fn stop(&self) {
        tracing::info!("Stopping orchestrator");
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!(in_flight = self.in_flight.len(), "Orchestrator stopped");
    }

    /// Accept an order and queue it for execution.
    ///
    /// Blocks while the execution queue is full. The order is accepted once it
    /// is stored; if queueing fails afterwards it stays PENDING and is picked
    /// up by recovery on the next start.
    ///
    /// # Errors
    ///
    /// Returns the rejection when validation or the store transaction fails.
    pub async fn submit_order(&self, new_order: NewOrder) -> Result<Order, SubmitRejection> {
        let order = self.submit.execute(new_order).await?;

        if self.config.trigger == RelayTrigger::Notify {
            self.relay_wake.notify_one();
        }

        match self.queue.enqueue(order.id().clone(), &self.shutdown).await {
            Ok(Enqueued::Queued | Enqueued::AlreadyInFlight) => {}
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id(),
                    error = %e,
                    "Order accepted but not queued, leaving it PENDING"
                );
            }
        }

        Ok(order)
    }

    /// The order store, for read paths.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Orders currently queued or executing.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Active settings.
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}

/// Re-enqueue PENDING orders oldest first; report EXECUTING ones.
async fn recover_orders<S>(store: Arc<S>, queue: ExecutionQueue, limit: usize, shutdown: CancellationToken)
where
    S: OrderStorePort + ?Sized,
{
    match store.list_orders(Some(OrderStatus::Executing), limit).await {
        Ok(stuck) => {
            for order in &stuck {
                tracing::warn!(
                    order_id = %order.id(),
                    updated_at = %order.updated_at(),
                    "Order was EXECUTING at startup; outcome unknown, leaving it for review"
                );
            }
        }
        Err(e) => tracing::warn!(error = %e, "Could not list EXECUTING orders"),
    }

    let pending = match store.list_orders(Some(OrderStatus::Pending), limit).await {
        Ok(orders) => orders,
        Err(e) => {
            tracing::error!(error = %e, "Could not list PENDING orders for recovery");
            return;
        }
    };

    let mut recovered = 0_usize;
    // Listed newest first.
    for order in pending.iter().rev() {
        match queue.enqueue(order.id().clone(), &shutdown).await {
            Ok(Enqueued::Queued) => recovered += 1,
            Ok(Enqueued::AlreadyInFlight) => {}
            Err(EnqueueError::ShuttingDown | EnqueueError::Closed) => break,
        }
    }

    if recovered > 0 {
        tracing::info!(recovered, "Re-enqueued PENDING orders");
    }
}
