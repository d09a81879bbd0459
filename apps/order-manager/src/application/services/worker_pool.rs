//! Execution Worker Pool
//!
//! A bounded queue of order ids feeding a fixed number of workers. Workers
//! share one receiver; each takes the next id, executes it to completion and
//! only then looks at the queue or the shutdown token again.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::InFlightOrders;
use crate::application::ports::{EventPublisherPort, ExchangePort, OrderStorePort};
use crate::application::use_cases::{ExecuteOrderUseCase, ExecutionError, ExecutionOutcome};
use crate::domain::shared::OrderId;

/// Result of an accepted enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The id was placed on the queue.
    Queued,
    /// The id is already queued or executing; nothing was added.
    AlreadyInFlight,
}

/// Enqueue failure. The id is not admitted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    /// Shutdown began while waiting for queue capacity.
    #[error("shutdown in progress")]
    ShuttingDown,
    /// All workers have exited.
    #[error("execution queue closed")]
    Closed,
}

/// Sending half of the execution queue.
#[derive(Clone)]
pub struct ExecutionQueue {
    sender: mpsc::Sender<OrderId>,
    in_flight: Arc<InFlightOrders>,
}

/// Create a bounded execution queue.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn execution_queue(
    capacity: usize,
    in_flight: Arc<InFlightOrders>,
) -> (ExecutionQueue, mpsc::Receiver<OrderId>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (ExecutionQueue { sender, in_flight }, receiver)
}

impl ExecutionQueue {
    /// Enqueue an order id for execution.
    ///
    /// Waits while the queue is full, passing backpressure to the caller.
    /// Gives up only when `shutdown` fires or the workers are gone.
    pub async fn enqueue(
        &self,
        order_id: OrderId,
        shutdown: &CancellationToken,
    ) -> Result<Enqueued, EnqueueError> {
        if !self.in_flight.try_admit(&order_id) {
            tracing::debug!(order_id = %order_id, "Order already in flight, not enqueuing");
            return Ok(Enqueued::AlreadyInFlight);
        }

        // Releases the admission unless the send completes, including when
        // this future is dropped while waiting for capacity.
        let mut admission = Admission {
            in_flight: &self.in_flight,
            order_id: Some(order_id.clone()),
        };

        tokio::select! {
            biased;
            () = shutdown.cancelled() => return Err(EnqueueError::ShuttingDown),
            sent = self.sender.send(order_id) => sent.map_err(|_| EnqueueError::Closed)?,
        }

        admission.order_id = None;
        Ok(Enqueued::Queued)
    }
}

struct Admission<'a> {
    in_flight: &'a InFlightOrders,
    order_id: Option<OrderId>,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if let Some(order_id) = self.order_id.take() {
            self.in_flight.release(&order_id);
        }
    }
}

/// Spawn `count` workers on `tracker`.
pub fn spawn_workers<S, X, P>(
    count: usize,
    receiver: mpsc::Receiver<OrderId>,
    use_case: Arc<ExecuteOrderUseCase<S, X, P>>,
    in_flight: Arc<InFlightOrders>,
    shutdown: &CancellationToken,
    tracker: &TaskTracker,
) where
    S: OrderStorePort + ?Sized + 'static,
    X: ExchangePort + ?Sized + 'static,
    P: EventPublisherPort + ?Sized + 'static,
{
    let receiver = Arc::new(Mutex::new(receiver));

    for worker_id in 0..count {
        tracker.spawn(run_worker(
            worker_id,
            Arc::clone(&receiver),
            Arc::clone(&use_case),
            Arc::clone(&in_flight),
            shutdown.clone(),
        ));
    }

    tracing::info!(workers = count, "Execution workers started");
}

async fn run_worker<S, X, P>(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<OrderId>>>,
    use_case: Arc<ExecuteOrderUseCase<S, X, P>>,
    in_flight: Arc<InFlightOrders>,
    shutdown: CancellationToken,
) where
    S: OrderStorePort + ?Sized,
    X: ExchangePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => None,
            order_id = next_order(&receiver) => order_id,
        };

        let Some(order_id) = next else {
            break;
        };

        tracing::debug!(worker_id, order_id = %order_id, "Worker picked up order");

        match use_case.execute(&order_id).await {
            Ok(ExecutionOutcome::Completed { .. } | ExecutionOutcome::Skipped { .. }) => {}
            Err(e @ ExecutionError::Exchange { .. }) => {
                tracing::warn!(worker_id, order_id = %order_id, error = %e, "Order execution failed");
            }
            Err(e) => {
                tracing::error!(
                    worker_id,
                    order_id = %order_id,
                    error = %e,
                    "Order execution aborted"
                );
            }
        }

        in_flight.release(&order_id);
    }

    tracing::info!(worker_id, "Execution worker stopped");
}

async fn next_order(receiver: &Mutex<mpsc::Receiver<OrderId>>) -> Option<OrderId> {
    receiver.lock().await.recv().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn duplicate_enqueue_is_dropped_while_in_flight() {
        let in_flight = Arc::new(InFlightOrders::new());
        let (queue, mut receiver) = execution_queue(4, Arc::clone(&in_flight));
        let shutdown = CancellationToken::new();

        let first = queue.enqueue(OrderId::new("O1"), &shutdown).await;
        let second = queue.enqueue(OrderId::new("O1"), &shutdown).await;

        assert_eq!(first, Ok(Enqueued::Queued));
        assert_eq!(second, Ok(Enqueued::AlreadyInFlight));
        assert_eq!(receiver.recv().await, Some(OrderId::new("O1")));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_blocks_until_capacity_frees() {
        let in_flight = Arc::new(InFlightOrders::new());
        let (queue, mut receiver) = execution_queue(1, Arc::clone(&in_flight));
        let shutdown = CancellationToken::new();

        queue.enqueue(OrderId::new("O1"), &shutdown).await.unwrap();

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            queue.enqueue(OrderId::new("O2"), &shutdown),
        )
        .await;
        assert!(blocked.is_err(), "enqueue into a full queue must wait");
        assert!(!in_flight.contains(&OrderId::new("O2")));

        let pending = tokio::spawn({
            let queue = queue.clone();
            let shutdown = shutdown.clone();
            async move { queue.enqueue(OrderId::new("O2"), &shutdown).await }
        });
        assert_eq!(receiver.recv().await, Some(OrderId::new("O1")));
        assert_eq!(pending.await.unwrap(), Ok(Enqueued::Queued));
    }

    #[tokio::test]
    async fn shutdown_releases_a_blocked_enqueue() {
        let in_flight = Arc::new(InFlightOrders::new());
        let (queue, _receiver) = execution_queue(1, Arc::clone(&in_flight));
        let shutdown = CancellationToken::new();
        queue.enqueue(OrderId::new("O1"), &shutdown).await.unwrap();

        let blocked = tokio::spawn({
            let queue = queue.clone();
            let shutdown = shutdown.clone();
            async move { queue.enqueue(OrderId::new("O2"), &shutdown).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        assert_eq!(blocked.await.unwrap(), Err(EnqueueError::ShuttingDown));
        assert!(!in_flight.contains(&OrderId::new("O2")));
    }

    #[tokio::test]
    async fn closed_queue_reports_closed() {
        let in_flight = Arc::new(InFlightOrders::new());
        let (queue, receiver) = execution_queue(1, Arc::clone(&in_flight));
        drop(receiver);

        let result = queue
            .enqueue(OrderId::new("O1"), &CancellationToken::new())
            .await;

        assert_eq!(result, Err(EnqueueError::Closed));
        assert!(in_flight.is_empty());
    }
}
