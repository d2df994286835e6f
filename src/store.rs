use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::Order;

/// Single source of truth for order state. Every mutation funnels through
/// `update_if`, which holds the per-order entry guard for the duration of
/// the check-and-write, so writes to one order are serialized while reads
/// and writes to other orders proceed unhindered.
pub struct OrderStore {
    orders: DashMap<Uuid, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }

    pub fn insert(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn get(&self, id: Uuid) -> Result<Order, AppError> {
        self.orders
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Snapshot of all orders; callers filter and sort. Pages served from a
    /// snapshot may trail a concurrent commit, which is acceptable for reads.
    pub fn snapshot(&self) -> Vec<Order> {
        self.orders.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Conditional write: applies `mutate` to a scratch copy of the order
    /// and installs it only if the stored version still matches
    /// `expected_version` and the mutation succeeds. The committed version
    /// is bumped by exactly one. On any failure nothing is written.
    pub fn update_if<F>(
        &self,
        id: Uuid,
        expected_version: u64,
        mutate: F,
    ) -> Result<Order, AppError>
    where
        F: FnOnce(&mut Order) -> Result<(), AppError>,
    {
        let mut entry = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        if entry.version != expected_version {
            return Err(AppError::StaleVersion {
                expected: expected_version,
                found: entry.version,
            });
        }

        let mut scratch = entry.value().clone();
        mutate(&mut scratch)?;
        scratch.version = expected_version + 1;

        *entry.value_mut() = scratch.clone();
        Ok(scratch)
    }

    /// Like `update_if`, but the precondition is evaluated by the caller
    /// against the live entry instead of a version the caller read earlier.
    /// Used by operations whose contract does not carry an expected version;
    /// the entry guard still serializes them against concurrent writers.
    pub fn update<F>(&self, id: Uuid, mutate: F) -> Result<Order, AppError>
    where
        F: FnOnce(&mut Order) -> Result<(), AppError>,
    {
        let mut entry = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        let current_version = entry.version;
        let mut scratch = entry.value().clone();
        mutate(&mut scratch)?;
        scratch.version = current_version + 1;

        *entry.value_mut() = scratch.clone();
        Ok(scratch)
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::OrderStore;
    use crate::error::AppError;
    use crate::models::order::{Order, OrderKind, OrderStatus};

    fn seed(store: &OrderStore) -> Uuid {
        let order = Order {
            id: Uuid::new_v4(),
            customer_ref: Uuid::new_v4(),
            laboratory_ref: None,
            courier_ref: None,
            kind: OrderKind::Prescription,
            products: Vec::new(),
            prescription_ref: Some("https://files.example/rx/7".to_string()),
            total_price: 0.0,
            is_paid: false,
            cod: true,
            needs_assignment: true,
            status: OrderStatus::Pending,
            status_history: Vec::new(),
            rejection_reason: None,
            version: 0,
            created_at: Utc::now(),
        };
        let id = order.id;
        store.insert(order);
        id
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let store = OrderStore::new();
        assert!(matches!(
            store.get(Uuid::new_v4()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn update_if_bumps_version_by_one() {
        let store = OrderStore::new();
        let id = seed(&store);

        let updated = store
            .update_if(id, 0, |order| {
                order.is_paid = true;
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.version, 1);
        assert!(store.get(id).unwrap().is_paid);
    }

    #[test]
    fn update_if_rejects_stale_version() {
        let store = OrderStore::new();
        let id = seed(&store);

        store
            .update_if(id, 0, |order| {
                order.is_paid = true;
                Ok(())
            })
            .unwrap();

        let err = store
            .update_if(id, 0, |order| {
                order.is_paid = false;
                Ok(())
            })
            .unwrap_err();

        assert_eq!(err, AppError::StaleVersion { expected: 0, found: 1 });
        assert!(store.get(id).unwrap().is_paid);
    }

    #[test]
    fn failed_mutation_writes_nothing() {
        let store = OrderStore::new();
        let id = seed(&store);

        let result = store.update_if(id, 0, |order| {
            order.is_paid = true;
            Err(AppError::NotEligible)
        });

        assert_eq!(result.unwrap_err(), AppError::NotEligible);
        let order = store.get(id).unwrap();
        assert!(!order.is_paid);
        assert_eq!(order.version, 0);
    }

    #[test]
    fn update_serializes_without_caller_version() {
        let store = OrderStore::new();
        let id = seed(&store);

        store
            .update(id, |order| {
                order.is_paid = true;
                Ok(())
            })
            .unwrap();
        let order = store
            .update(id, |order| {
                order.rejection_reason = Some("address unreachable".to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(order.version, 2);
    }
}
