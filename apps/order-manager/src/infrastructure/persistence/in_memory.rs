//! In-memory order store.
//!
//! Both tables sit behind one `RwLock`; every multi-row write takes the write
//! lock once, which makes it atomic with respect to all other operations.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{OrderStorePort, StoreError};
use crate::domain::order_execution::{Order, OrderStatus};
use crate::domain::outbox::{NewOutboxEvent, OutboxEvent, OutboxEventId};
use crate::domain::shared::{OrderId, Timestamp};

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderId, StoredOrder>,
    outbox: BTreeMap<OutboxEventId, OutboxEvent>,
    last_event_id: i64,
    last_seq: u64,
}

#[derive(Debug)]
struct StoredOrder {
    order: Order,
    // Insertion order; breaks created_at ties when listing.
    seq: u64,
}

impl Tables {
    fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        if self.orders.contains_key(order.id()) {
            return Err(StoreError::DuplicateOrderId {
                order_id: order.id().to_string(),
            });
        }
        self.last_seq += 1;
        self.orders.insert(
            order.id().clone(),
            StoredOrder {
                order: order.clone(),
                seq: self.last_seq,
            },
        );
        Ok(())
    }

    fn replace_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let stored = self
            .orders
            .get_mut(order.id())
            .ok_or_else(|| StoreError::NotFound {
                order_id: order.id().to_string(),
            })?;
        stored.order = order.clone();
        Ok(())
    }

    fn insert_event(&mut self, event: NewOutboxEvent) -> OutboxEvent {
        self.last_event_id += 1;
        let stored = event.into_stored(OutboxEventId::new(self.last_event_id));
        self.outbox.insert(stored.id, stored.clone());
        stored
    }
}

/// In-memory implementation of [`OrderStorePort`].
///
/// The default store. Contents are lost on restart.
#[derive(Debug)]
pub struct InMemoryOrderStore {
    tables: RwLock<Tables>,
    available: AtomicBool,
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: while unavailable every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Insert an order row without an outbox row (for test setup).
    pub fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        self.check_available()?;
        self.tables.write().insert_order(&order)
    }

    /// Insert an outbox row on its own (for test setup).
    pub fn insert_outbox_event(&self, event: NewOutboxEvent) -> Result<OutboxEvent, StoreError> {
        self.check_available()?;
        Ok(self.tables.write().insert_event(event))
    }

    /// All outbox rows in key order.
    #[must_use]
    pub fn outbox_snapshot(&self) -> Vec<OutboxEvent> {
        self.tables.read().outbox.values().cloned().collect()
    }

    /// Number of order rows.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.tables.read().orders.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("in-memory store is offline"))
        }
    }
}

#[async_trait]
impl OrderStorePort for InMemoryOrderStore {
    async fn create_order_and_outbox_event(
        &self,
        order: &Order,
        event: NewOutboxEvent,
    ) -> Result<OutboxEvent, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write();
        tables.insert_order(order)?;
        Ok(tables.insert_event(event))
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, StoreError> {
        self.check_available()?;
        self.tables
            .read()
            .orders
            .get(id)
            .map(|stored| stored.order.clone())
            .ok_or_else(|| StoreError::NotFound {
                order_id: id.to_string(),
            })
    }

    async fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        self.check_available()?;
        self.tables.write().replace_order(order)
    }

    async fn update_order_and_outbox_event(
        &self,
        order: &Order,
        event: NewOutboxEvent,
    ) -> Result<OutboxEvent, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write();
        tables.replace_order(order)?;
        Ok(tables.insert_event(event))
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read();

        let mut matching: Vec<&StoredOrder> = tables
            .orders
            .values()
            .filter(|stored| status.is_none_or(|s| stored.order.status() == s))
            .collect();
        matching.sort_by(|a, b| {
            b.order
                .created_at()
                .cmp(&a.order.created_at())
                .then(b.seq.cmp(&a.seq))
        });

        Ok(matching
            .into_iter()
            .take(limit)
            .map(|stored| stored.order.clone())
            .collect())
    }

    async fn fetch_unprocessed_events(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read();

        let mut pending: Vec<&OutboxEvent> =
            tables.outbox.values().filter(|e| !e.processed).collect();
        pending.sort_by_key(|e| (e.created_at, e.id));

        Ok(pending.into_iter().take(limit).cloned().collect())
    }

    async fn mark_event_processed(
        &self,
        id: OutboxEventId,
        processed_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let event = tables
            .outbox
            .get_mut(&id)
            .ok_or(StoreError::EventNotFound { event_id: id })?;

        if !event.processed {
            event.processed = true;
            event.processed_at = Some(processed_at);
        }
        Ok(())
    }

    async fn oldest_unprocessed_event_at(&self) -> Result<Option<Timestamp>, StoreError> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .outbox
            .values()
            .filter(|e| !e.processed)
            .map(|e| e.created_at)
            .min())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{NewOrder, OrderEventType, OrderSide, OrderType};
    use crate::domain::shared::Symbol;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn order_at(id: &str, created_at: Timestamp) -> Order {
        Order::new(
            NewOrder {
                id: OrderId::new(id),
                symbol: Symbol::new("BTCUSDT"),
                side: OrderSide::Buy,
                order_type: OrderType::Market,
                quantity: dec!(0.5),
                price: None,
            },
            created_at,
        )
        .unwrap()
    }

    fn submitted(order: &Order) -> NewOutboxEvent {
        NewOutboxEvent::for_order(order, OrderEventType::OrderSubmitted, order.created_at()).unwrap()
    }

    async fn create(store: &InMemoryOrderStore, order: &Order) -> OutboxEvent {
        store
            .create_order_and_outbox_event(order, submitted(order))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_writes_order_and_unprocessed_event() {
        let store = InMemoryOrderStore::new();
        let order = order_at("O1", Timestamp::now());

        let event = create(&store, &order).await;

        assert_eq!(store.get_order(order.id()).await.unwrap(), order);
        assert_eq!(event.aggregate_id, "O1");
        assert_eq!(event.event_type, "OrderSubmitted");
        assert!(!event.processed);
        assert_eq!(store.outbox_snapshot(), vec![event]);
    }

    #[tokio::test]
    async fn duplicate_create_writes_nothing() {
        let store = InMemoryOrderStore::new();
        let order = order_at("O1", Timestamp::now());
        create(&store, &order).await;

        let result = store
            .create_order_and_outbox_event(&order, submitted(&order))
            .await;

        assert_eq!(
            result,
            Err(StoreError::DuplicateOrderId {
                order_id: "O1".to_string()
            })
        );
        assert_eq!(store.order_count(), 1);
        assert_eq!(store.outbox_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_order_writes_no_event() {
        let store = InMemoryOrderStore::new();
        let order = order_at("ghost", Timestamp::now());

        let result = store
            .update_order_and_outbox_event(&order, submitted(&order))
            .await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert!(store.outbox_snapshot().is_empty());
    }

    #[tokio::test]
    async fn list_orders_is_newest_first_and_filtered() {
        let store = InMemoryOrderStore::new();
        let base = Utc::now();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let created_at = Timestamp::new(base + Duration::seconds(i64::try_from(i).unwrap()));
            create(&store, &order_at(id, created_at)).await;
        }
        let mut done = store.get_order(&OrderId::new("b")).await.unwrap();
        done.start_execution(Timestamp::now()).unwrap();
        done.complete(Timestamp::now()).unwrap();
        store.update_order(&done).await.unwrap();

        let all = store.list_orders(None, 10).await.unwrap();
        let ids: Vec<_> = all.iter().map(|o| o.id().as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);

        let pending = store.list_orders(Some(OrderStatus::Pending), 10).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|o| o.id().as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);

        assert_eq!(store.list_orders(None, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_orders_breaks_ties_by_insertion() {
        let store = InMemoryOrderStore::new();
        let same = Timestamp::now();
        create(&store, &order_at("first", same)).await;
        create(&store, &order_at("second", same)).await;

        let listed = store.list_orders(None, 10).await.unwrap();

        assert_eq!(listed[0].id().as_str(), "second");
        assert_eq!(listed[1].id().as_str(), "first");
    }

    #[tokio::test]
    async fn mark_processed_keeps_first_timestamp() {
        let store = InMemoryOrderStore::new();
        let event = create(&store, &order_at("O1", Timestamp::now())).await;
        let first = Timestamp::new(Utc::now() - Duration::seconds(5));

        store.mark_event_processed(event.id, first).await.unwrap();
        store
            .mark_event_processed(event.id, Timestamp::now())
            .await
            .unwrap();

        let stored = &store.outbox_snapshot()[0];
        assert!(stored.processed);
        assert_eq!(stored.processed_at, Some(first));
        assert!(store.fetch_unprocessed_events(10).await.unwrap().is_empty());
        assert_eq!(store.oldest_unprocessed_event_at().await.unwrap(), None);
    }

    #[tokio::test]
    async fn mark_unknown_event_fails() {
        let store = InMemoryOrderStore::new();

        let result = store
            .mark_event_processed(OutboxEventId::new(42), Timestamp::now())
            .await;

        assert_eq!(
            result,
            Err(StoreError::EventNotFound {
                event_id: OutboxEventId::new(42)
            })
        );
    }

    #[tokio::test]
    async fn offline_store_rejects_everything() {
        let store = InMemoryOrderStore::new();
        let order = order_at("O1", Timestamp::now());
        store.set_available(false);

        let created = store
            .create_order_and_outbox_event(&order, submitted(&order))
            .await;
        assert!(matches!(created, Err(StoreError::Unavailable { .. })));
        assert!(store.fetch_unprocessed_events(1).await.is_err());

        store.set_available(true);
        assert_eq!(store.order_count(), 0);
        create(&store, &order).await;
        assert_eq!(store.order_count(), 1);
    }
}
