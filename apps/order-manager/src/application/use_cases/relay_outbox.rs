//! Relay Outbox Use Case
//!
//! One relay cycle: publish the oldest unprocessed outbox rows and mark each
//! one processed after the publisher accepted it. A row that fails is left
//! for the next cycle and does not hold back the rows after it.

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{EventPublisherPort, OrderStorePort, StoreError};
use crate::domain::outbox::{EventEnvelope, OutboxEvent};
use crate::domain::shared::Timestamp;
use crate::observability;

/// Result of one relay cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCycleReport {
    /// Rows fetched.
    pub fetched: usize,
    /// Rows published and marked processed.
    pub published: usize,
    /// Rows left unprocessed for the next cycle.
    pub failed: usize,
}

impl RelayCycleReport {
    /// True when the cycle found nothing to do.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.fetched == 0
    }
}

/// Use case for relaying outbox rows to the bus.
pub struct RelayOutboxUseCase<S, P>
where
    S: OrderStorePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    store: Arc<S>,
    publisher: Arc<P>,
    topic: String,
    batch_size: usize,
}

impl<S, P> RelayOutboxUseCase<S, P>
where
    S: OrderStorePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    /// Create a new RelayOutboxUseCase.
    pub fn new(store: Arc<S>, publisher: Arc<P>, topic: impl Into<String>, batch_size: usize) -> Self {
        Self {
            store,
            publisher,
            topic: topic.into(),
            batch_size,
        }
    }

    /// Run one cycle.
    ///
    /// Only a failed fetch is an error; per-row failures are counted in the
    /// report.
    pub async fn run_cycle(&self) -> Result<RelayCycleReport, StoreError> {
        let events = self.store.fetch_unprocessed_events(self.batch_size).await?;

        let mut report = RelayCycleReport {
            fetched: events.len(),
            ..RelayCycleReport::default()
        };

        for event in &events {
            if self.relay_one(event).await {
                report.published += 1;
            } else {
                report.failed += 1;
            }
        }

        Ok(report)
    }

    /// Publish one row and mark it processed. Returns false if either step
    /// failed.
    async fn relay_one(&self, event: &OutboxEvent) -> bool {
        let payload = match EventEnvelope::from(event).to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(event_id = %event.id, error = %e, "Failed to encode outbox event");
                return false;
            }
        };

        if let Err(e) = self
            .publisher
            .publish(&self.topic, &event.aggregate_id, &payload)
            .await
        {
            observability::record_publish("relay", false);
            tracing::warn!(
                event_id = %event.id,
                aggregate_id = %event.aggregate_id,
                event_type = %event.event_type,
                error = %e,
                "Failed to publish outbox event, will retry next cycle"
            );
            return false;
        }
        observability::record_publish("relay", true);

        // Published but not marked: the next cycle publishes it again.
        if let Err(e) = self
            .store
            .mark_event_processed(event.id, Timestamp::now())
            .await
        {
            tracing::warn!(
                event_id = %event.id,
                error = %e,
                "Published outbox event but failed to mark it processed"
            );
            return false;
        }

        tracing::debug!(
            event_id = %event.id,
            aggregate_id = %event.aggregate_id,
            event_type = %event.event_type,
            "Relayed outbox event"
        );
        true
    }

    /// Age of the oldest unprocessed row, zero if there is none.
    pub async fn backlog_age(&self) -> Result<Duration, StoreError> {
        let oldest = self.store.oldest_unprocessed_event_at().await?;
        Ok(oldest.map_or(Duration::ZERO, |created_at| {
            Timestamp::now()
                .duration_since(created_at)
                .to_std()
                .unwrap_or(Duration::ZERO)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::application::ports::EventPublishError;
    use crate::domain::outbox::NewOutboxEvent;
    use crate::infrastructure::persistence::InMemoryOrderStore;

    /// Records published keys; fails for keys listed in `failing`.
    #[derive(Default)]
    struct ScriptedPublisher {
        failing: Mutex<Vec<String>>,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventPublisherPort for ScriptedPublisher {
        async fn publish(
            &self,
            _topic: &str,
            key: &str,
            _payload: &[u8],
        ) -> Result<(), EventPublishError> {
            if self.failing.lock().iter().any(|k| k == key) {
                return Err(EventPublishError::PublishFailed {
                    message: format!("cannot publish {key}"),
                });
            }
            self.sent.lock().push(key.to_string());
            Ok(())
        }
    }

    fn at(offset_ms: i64) -> Timestamp {
        Timestamp::new(Utc::now() - ChronoDuration::seconds(60) + ChronoDuration::milliseconds(offset_ms))
    }

    async fn insert(store: &InMemoryOrderStore, key: &str, created_at: Timestamp) {
        store
            .insert_outbox_event(NewOutboxEvent {
                aggregate_type: "Order".to_string(),
                aggregate_id: key.to_string(),
                event_type: "OrderSubmitted".to_string(),
                payload: json!({ "id": key }),
                created_at,
            })
            .unwrap();
    }

    fn relay(
        store: &Arc<InMemoryOrderStore>,
        publisher: &Arc<ScriptedPublisher>,
    ) -> RelayOutboxUseCase<InMemoryOrderStore, ScriptedPublisher> {
        RelayOutboxUseCase::new(Arc::clone(store), Arc::clone(publisher), "order-events", 100)
    }

    #[tokio::test]
    async fn publishes_in_created_at_order_regardless_of_insertion_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let publisher = Arc::new(ScriptedPublisher::default());
        insert(&store, "t3", at(3)).await;
        insert(&store, "t1", at(1)).await;
        insert(&store, "t2", at(2)).await;

        let report = relay(&store, &publisher).run_cycle().await.unwrap();

        assert_eq!(
            report,
            RelayCycleReport {
                fetched: 3,
                published: 3,
                failed: 0
            }
        );
        assert_eq!(*publisher.sent.lock(), vec!["t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn second_cycle_without_new_rows_is_a_noop() {
        let store = Arc::new(InMemoryOrderStore::new());
        let publisher = Arc::new(ScriptedPublisher::default());
        insert(&store, "O1", at(0)).await;
        let relay = relay(&store, &publisher);

        relay.run_cycle().await.unwrap();
        let snapshot = store.outbox_snapshot();
        let second = relay.run_cycle().await.unwrap();

        assert!(second.is_idle());
        assert_eq!(publisher.sent.lock().len(), 1);
        assert_eq!(store.outbox_snapshot(), snapshot);
    }

    #[tokio::test]
    async fn failing_row_does_not_block_the_others() {
        let store = Arc::new(InMemoryOrderStore::new());
        let publisher = Arc::new(ScriptedPublisher::default());
        insert(&store, "r1", at(1)).await;
        insert(&store, "r2", at(2)).await;
        insert(&store, "r3", at(3)).await;
        publisher.failing.lock().push("r2".to_string());
        let relay = relay(&store, &publisher);

        let report = relay.run_cycle().await.unwrap();

        assert_eq!(report.published, 2);
        assert_eq!(report.failed, 1);
        let remaining = store.fetch_unprocessed_events(10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].aggregate_id, "r2");

        let processed: Vec<_> = store
            .outbox_snapshot()
            .into_iter()
            .filter(|e| e.processed)
            .map(|e| {
                assert!(e.processed_at.is_some());
                e.aggregate_id
            })
            .collect();
        assert_eq!(processed, vec!["r1", "r3"]);

        // Retried every cycle until it succeeds.
        relay.run_cycle().await.unwrap();
        publisher.failing.lock().clear();
        let report = relay.run_cycle().await.unwrap();
        assert_eq!(report.published, 1);
        assert!(store.fetch_unprocessed_events(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn respects_batch_size() {
        let store = Arc::new(InMemoryOrderStore::new());
        let publisher = Arc::new(ScriptedPublisher::default());
        for i in 0..5 {
            insert(&store, &format!("O{i}"), at(i)).await;
        }
        let relay =
            RelayOutboxUseCase::new(Arc::clone(&store), Arc::clone(&publisher), "order-events", 2);

        let report = relay.run_cycle().await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(*publisher.sent.lock(), vec!["O0", "O1"]);
    }

    #[tokio::test]
    async fn unavailable_store_fails_the_cycle() {
        let store = Arc::new(InMemoryOrderStore::new());
        let publisher = Arc::new(ScriptedPublisher::default());
        store.set_available(false);

        let result = relay(&store, &publisher).run_cycle().await;

        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn backlog_age_tracks_oldest_unprocessed_row() {
        let store = Arc::new(InMemoryOrderStore::new());
        let publisher = Arc::new(ScriptedPublisher::default());
        let relay = relay(&store, &publisher);

        assert_eq!(relay.backlog_age().await.unwrap(), Duration::ZERO);

        insert(&store, "O1", at(0)).await;
        assert!(relay.backlog_age().await.unwrap() >= Duration::from_secs(59));

        relay.run_cycle().await.unwrap();
        assert_eq!(relay.backlog_age().await.unwrap(), Duration::ZERO);
    }
}
