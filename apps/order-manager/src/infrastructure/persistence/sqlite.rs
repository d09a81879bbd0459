//! SQLite order store backed by Turso.
//!
//! One connection, serialized by an async mutex. Multi-row writes run inside
//! `BEGIN IMMEDIATE` and roll back on any error.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use turso::{Builder, Connection, Row, Value};

use crate::application::ports::{OrderStorePort, StoreError};
use crate::domain::order_execution::aggregate::ReconstitutedOrderParams;
use crate::domain::order_execution::{Order, OrderSide, OrderStatus, OrderType};
use crate::domain::outbox::{NewOutboxEvent, OutboxEvent, OutboxEventId};
use crate::domain::shared::{OrderId, Symbol, Timestamp};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        symbol TEXT NOT NULL,
        side TEXT NOT NULL,
        order_type TEXT NOT NULL,
        quantity TEXT NOT NULL,
        price TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS outbox_events (
        id INTEGER PRIMARY KEY,
        aggregate_type TEXT NOT NULL,
        aggregate_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        payload TEXT NOT NULL,
        processed INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        processed_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_outbox_unprocessed
        ON outbox_events (processed, created_at)",
];

const ORDER_COLUMNS: &str =
    "id, symbol, side, order_type, quantity, price, status, created_at, updated_at";

const EVENT_COLUMNS: &str =
    "id, aggregate_type, aggregate_id, event_type, payload, processed, created_at, processed_at";

/// Turso implementation of [`OrderStorePort`].
pub struct TursoOrderStore {
    conn: Mutex<Connection>,
}

impl TursoOrderStore {
    /// Open (or create) the database file and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the file cannot be opened or the
    /// schema cannot be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::unavailable)?;
        }

        let db = Builder::new_local(&path.to_string_lossy())
            .build()
            .await
            .map_err(StoreError::unavailable)?;
        let conn = db.connect().map_err(StoreError::unavailable)?;

        for statement in SCHEMA {
            conn.execute(statement, ())
                .await
                .map_err(StoreError::unavailable)?;
        }

        tracing::info!(path = %path.display(), "Opened SQLite order store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl OrderStorePort for TursoOrderStore {
    async fn create_order_and_outbox_event(
        &self,
        order: &Order,
        event: NewOutboxEvent,
    ) -> Result<OutboxEvent, StoreError> {
        let conn = self.conn.lock().await;
        begin(&conn).await?;

        let result = async {
            if order_exists(&conn, order.id()).await? {
                return Err(StoreError::DuplicateOrderId {
                    order_id: order.id().to_string(),
                });
            }
            insert_order(&conn, order).await?;
            insert_event(&conn, event).await
        }
        .await;

        finish(&conn, result).await
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, StoreError> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                (id.as_str(),),
            )
            .await
            .map_err(StoreError::unavailable)?;

        match rows.next().await.map_err(StoreError::unavailable)? {
            Some(row) => order_from_row(&row),
            None => Err(StoreError::NotFound {
                order_id: id.to_string(),
            }),
        }
    }

    async fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        update_order_row(&conn, order).await
    }

    async fn update_order_and_outbox_event(
        &self,
        order: &Order,
        event: NewOutboxEvent,
    ) -> Result<OutboxEvent, StoreError> {
        let conn = self.conn.lock().await;
        begin(&conn).await?;

        let result = async {
            update_order_row(&conn, order).await?;
            insert_event(&conn, event).await
        }
        .await;

        finish(&conn, result).await
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        let conn = self.conn.lock().await;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut rows = match status {
            Some(status) => {
                conn.query(
                    &format!(
                        "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 \
                         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
                    ),
                    (status.as_str(), limit),
                )
                .await
            }
            None => {
                conn.query(
                    &format!(
                        "SELECT {ORDER_COLUMNS} FROM orders \
                         ORDER BY created_at DESC, rowid DESC LIMIT ?1"
                    ),
                    (limit,),
                )
                .await
            }
        }
        .map_err(StoreError::unavailable)?;

        let mut orders = Vec::new();
        while let Some(row) = rows.next().await.map_err(StoreError::unavailable)? {
            orders.push(order_from_row(&row)?);
        }
        Ok(orders)
    }

    async fn fetch_unprocessed_events(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM outbox_events WHERE processed = 0 \
                     ORDER BY created_at ASC, id ASC LIMIT ?1"
                ),
                (i64::try_from(limit).unwrap_or(i64::MAX),),
            )
            .await
            .map_err(StoreError::unavailable)?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await.map_err(StoreError::unavailable)? {
            events.push(event_from_row(&row)?);
        }
        Ok(events)
    }

    async fn mark_event_processed(
        &self,
        id: OutboxEventId,
        processed_at: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;

        let mut rows = conn
            .query(
                "SELECT processed FROM outbox_events WHERE id = ?1",
                (id.value(),),
            )
            .await
            .map_err(StoreError::unavailable)?;
        let Some(row) = rows.next().await.map_err(StoreError::unavailable)? else {
            return Err(StoreError::EventNotFound { event_id: id });
        };
        if integer(&row, 0)? != 0 {
            return Ok(());
        }
        drop(rows);

        conn.execute(
            "UPDATE outbox_events SET processed = 1, processed_at = ?1 \
             WHERE id = ?2 AND processed = 0",
            (processed_at.to_rfc3339(), id.value()),
        )
        .await
        .map_err(StoreError::unavailable)?;
        Ok(())
    }

    async fn oldest_unprocessed_event_at(&self) -> Result<Option<Timestamp>, StoreError> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT created_at FROM outbox_events WHERE processed = 0 \
                 ORDER BY created_at ASC LIMIT 1",
                (),
            )
            .await
            .map_err(StoreError::unavailable)?;

        match rows.next().await.map_err(StoreError::unavailable)? {
            Some(row) => Ok(Some(timestamp(&row, 0)?)),
            None => Ok(None),
        }
    }
}

// ============================================
// Transactions
// ============================================

async fn begin(conn: &Connection) -> Result<(), StoreError> {
    conn.execute("BEGIN IMMEDIATE", ())
        .await
        .map_err(StoreError::unavailable)?;
    Ok(())
}

async fn finish<T>(conn: &Connection, result: Result<T, StoreError>) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            if let Err(e) = conn.execute("COMMIT", ()).await {
                rollback(conn).await;
                return Err(StoreError::unavailable(e));
            }
            Ok(value)
        }
        Err(e) => {
            rollback(conn).await;
            Err(e)
        }
    }
}

async fn rollback(conn: &Connection) {
    if let Err(e) = conn.execute("ROLLBACK", ()).await {
        tracing::error!(error = %e, "Failed to roll back SQLite transaction");
    }
}

// ============================================
// Statements
// ============================================

async fn order_exists(conn: &Connection, id: &OrderId) -> Result<bool, StoreError> {
    let mut rows = conn
        .query("SELECT 1 FROM orders WHERE id = ?1", (id.as_str(),))
        .await
        .map_err(StoreError::unavailable)?;
    Ok(rows
        .next()
        .await
        .map_err(StoreError::unavailable)?
        .is_some())
}

async fn insert_order(conn: &Connection, order: &Order) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        (
            order.id().as_str(),
            order.symbol().as_str(),
            order.side().as_str(),
            order.order_type().as_str(),
            order.quantity().to_string(),
            order.price().to_string(),
            order.status().as_str(),
            order.created_at().to_rfc3339(),
            order.updated_at().to_rfc3339(),
        ),
    )
    .await
    .map_err(StoreError::unavailable)?;
    Ok(())
}

async fn update_order_row(conn: &Connection, order: &Order) -> Result<(), StoreError> {
    let changed = conn
        .execute(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
            (
                order.status().as_str(),
                order.updated_at().to_rfc3339(),
                order.id().as_str(),
            ),
        )
        .await
        .map_err(StoreError::unavailable)?;

    if changed == 0 {
        return Err(StoreError::NotFound {
            order_id: order.id().to_string(),
        });
    }
    Ok(())
}

async fn insert_event(conn: &Connection, event: NewOutboxEvent) -> Result<OutboxEvent, StoreError> {
    let payload = serde_json::to_string(&event.payload).map_err(StoreError::corrupt)?;
    conn.execute(
        "INSERT INTO outbox_events (aggregate_type, aggregate_id, event_type, payload, processed, created_at) \
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        (
            event.aggregate_type.as_str(),
            event.aggregate_id.as_str(),
            event.event_type.as_str(),
            payload,
            event.created_at.to_rfc3339(),
        ),
    )
    .await
    .map_err(StoreError::unavailable)?;

    let id = OutboxEventId::new(conn.last_insert_rowid());
    Ok(event.into_stored(id))
}

// ============================================
// Row Decoding
// ============================================

fn order_from_row(row: &Row) -> Result<Order, StoreError> {
    let status = text(row, 6)?;
    Ok(Order::reconstitute(ReconstitutedOrderParams {
        id: OrderId::new(text(row, 0)?),
        symbol: Symbol::new(text(row, 1)?),
        side: OrderSide::parse(&text(row, 2)?)
            .ok_or_else(|| StoreError::corrupt("unknown order side"))?,
        order_type: OrderType::parse(&text(row, 3)?)
            .ok_or_else(|| StoreError::corrupt("unknown order type"))?,
        quantity: decimal(row, 4)?,
        price: decimal(row, 5)?,
        status: OrderStatus::from_str(&status).map_err(StoreError::corrupt)?,
        created_at: timestamp(row, 7)?,
        updated_at: timestamp(row, 8)?,
    }))
}

fn event_from_row(row: &Row) -> Result<OutboxEvent, StoreError> {
    let processed_at = match row.get_value(7).map_err(StoreError::corrupt)? {
        Value::Null => None,
        Value::Text(s) => Some(Timestamp::parse(&s).map_err(StoreError::corrupt)?),
        other => return Err(StoreError::corrupt(format!("processed_at: {other:?}"))),
    };

    Ok(OutboxEvent {
        id: OutboxEventId::new(integer(row, 0)?),
        aggregate_type: text(row, 1)?,
        aggregate_id: text(row, 2)?,
        event_type: text(row, 3)?,
        payload: serde_json::from_str(&text(row, 4)?).map_err(StoreError::corrupt)?,
        processed: integer(row, 5)? != 0,
        created_at: timestamp(row, 6)?,
        processed_at,
    })
}

fn text(row: &Row, idx: usize) -> Result<String, StoreError> {
    match row.get_value(idx).map_err(StoreError::corrupt)? {
        Value::Text(s) => Ok(s),
        other => Err(StoreError::corrupt(format!("column {idx}: expected text, got {other:?}"))),
    }
}

fn integer(row: &Row, idx: usize) -> Result<i64, StoreError> {
    match row.get_value(idx).map_err(StoreError::corrupt)? {
        Value::Integer(i) => Ok(i),
        other => Err(StoreError::corrupt(format!(
            "column {idx}: expected integer, got {other:?}"
        ))),
    }
}

fn decimal(row: &Row, idx: usize) -> Result<Decimal, StoreError> {
    Decimal::from_str(&text(row, idx)?).map_err(StoreError::corrupt)
}

fn timestamp(row: &Row, idx: usize) -> Result<Timestamp, StoreError> {
    Timestamp::parse(&text(row, idx)?).map_err(StoreError::corrupt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{NewOrder, OrderEventType};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, TursoOrderStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TursoOrderStore::open(dir.path().join("orders.db"))
            .await
            .unwrap();
        (dir, store)
    }

    fn limit_order(id: &str) -> Order {
        Order::new(
            NewOrder {
                id: OrderId::new(id),
                symbol: Symbol::new("ETHUSDT"),
                side: OrderSide::Sell,
                order_type: OrderType::Limit,
                quantity: dec!(1.25),
                price: Some(dec!(3150.5)),
            },
            Timestamp::now(),
        )
        .unwrap()
    }

    fn submitted(order: &Order) -> NewOutboxEvent {
        NewOutboxEvent::for_order(order, OrderEventType::OrderSubmitted, order.created_at()).unwrap()
    }

    #[tokio::test]
    async fn order_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.db");
        let order = limit_order("O1");

        {
            let store = TursoOrderStore::open(&path).await.unwrap();
            store
                .create_order_and_outbox_event(&order, submitted(&order))
                .await
                .unwrap();
        }

        let store = TursoOrderStore::open(&path).await.unwrap();
        assert_eq!(store.get_order(order.id()).await.unwrap(), order);
        assert_eq!(store.fetch_unprocessed_events(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn nanosecond_timestamps_are_stored_exactly() {
        use chrono::TimeZone;

        let (_dir, store) = open_store().await;
        let at = Timestamp::new(
            chrono::Utc
                .timestamp_opt(1_700_000_000, 123_456_789)
                .single()
                .unwrap(),
        );
        let order = Order::new(
            NewOrder {
                id: OrderId::new("O1"),
                symbol: Symbol::new("BTCUSDT"),
                side: OrderSide::Buy,
                order_type: OrderType::Market,
                quantity: dec!(0.001),
                price: None,
            },
            at,
        )
        .unwrap();
        store
            .create_order_and_outbox_event(&order, submitted(&order))
            .await
            .unwrap();

        let stored = store.get_order(order.id()).await.unwrap();
        let events = store.fetch_unprocessed_events(10).await.unwrap();

        assert_eq!(stored.created_at(), at);
        assert_eq!(stored.updated_at(), at);
        assert_eq!(events[0].created_at, at);
        assert_eq!(
            events[0].payload["createdAt"],
            serde_json::to_value(at).unwrap()
        );
        assert_eq!(store.oldest_unprocessed_event_at().await.unwrap(), Some(at));
    }

    #[tokio::test]
    async fn duplicate_create_rolls_back() {
        let (_dir, store) = open_store().await;
        let order = limit_order("O1");
        store
            .create_order_and_outbox_event(&order, submitted(&order))
            .await
            .unwrap();

        let result = store
            .create_order_and_outbox_event(&order, submitted(&order))
            .await;

        assert!(matches!(result, Err(StoreError::DuplicateOrderId { .. })));
        assert_eq!(store.fetch_unprocessed_events(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn terminal_update_and_event_commit_together() {
        let (_dir, store) = open_store().await;
        let mut order = limit_order("O1");
        store
            .create_order_and_outbox_event(&order, submitted(&order))
            .await
            .unwrap();

        order.start_execution(Timestamp::now()).unwrap();
        store.update_order(&order).await.unwrap();
        order.complete(Timestamp::now()).unwrap();
        let event =
            NewOutboxEvent::for_order(&order, OrderEventType::OrderCompleted, Timestamp::now())
                .unwrap();
        store
            .update_order_and_outbox_event(&order, event)
            .await
            .unwrap();

        let stored = store.get_order(order.id()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Completed);
        let events = store.fetch_unprocessed_events(10).await.unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["OrderSubmitted", "OrderCompleted"]);
    }

    #[tokio::test]
    async fn mark_processed_is_idempotent() {
        let (_dir, store) = open_store().await;
        let order = limit_order("O1");
        let event = store
            .create_order_and_outbox_event(&order, submitted(&order))
            .await
            .unwrap();

        store
            .mark_event_processed(event.id, Timestamp::now())
            .await
            .unwrap();
        store
            .mark_event_processed(event.id, Timestamp::now())
            .await
            .unwrap();

        assert!(store.fetch_unprocessed_events(10).await.unwrap().is_empty());
        assert_eq!(store.oldest_unprocessed_event_at().await.unwrap(), None);
        assert!(matches!(
            store
                .mark_event_processed(OutboxEventId::new(999), Timestamp::now())
                .await,
            Err(StoreError::EventNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (_dir, store) = open_store().await;
        for id in ["a", "b"] {
            let order = limit_order(id);
            store
                .create_order_and_outbox_event(&order, submitted(&order))
                .await
                .unwrap();
        }

        let pending = store
            .list_orders(Some(OrderStatus::Pending), 10)
            .await
            .unwrap();
        let failed = store
            .list_orders(Some(OrderStatus::Failed), 10)
            .await
            .unwrap();

        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id().as_str(), "b");
        assert!(failed.is_empty());
    }
}
