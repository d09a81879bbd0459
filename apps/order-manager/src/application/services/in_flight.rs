//! Admission set for order execution.
//!
//! An order id is admitted when it is enqueued and released when a worker
//! finishes with it. While admitted, further enqueues of the same id are
//! dropped, so no two workers ever hold the same order.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::domain::shared::OrderId;
use crate::observability;

/// Ids of orders that are queued or being executed.
#[derive(Debug, Default)]
pub struct InFlightOrders {
    ids: Mutex<HashSet<OrderId>>,
}

impl InFlightOrders {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `id`. Returns false if it is already in flight.
    pub fn try_admit(&self, id: &OrderId) -> bool {
        let mut ids = self.ids.lock();
        let admitted = ids.insert(id.clone());
        observability::update_in_flight_orders(ids.len());
        admitted
    }

    /// Release `id`. Returns false if it was not in flight.
    pub fn release(&self, id: &OrderId) -> bool {
        let mut ids = self.ids.lock();
        let removed = ids.remove(id);
        observability::update_in_flight_orders(ids.len());
        removed
    }

    /// Whether `id` is in flight.
    pub fn contains(&self, id: &OrderId) -> bool {
        self.ids.lock().contains(id)
    }

    /// Number of ids in flight.
    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }
}
