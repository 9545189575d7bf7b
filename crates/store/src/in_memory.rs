//! In-memory inventory store for tests/dev.
//!
//! Models the database's concurrency behavior, not just its data: each
//! product has a row lock (a `tokio::sync::Mutex`), writes are staged in the
//! transaction and published at commit, and the order-id sequence advances
//! even for transactions that later roll back (like a DB sequence would).
//! Reads only ever see committed state.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use stockgate_core::{NewOrder, Order, OrderId, OrderStats, Product, ProductId, StatsFilter};

use crate::error::StoreError;
use crate::seed::{self, BASELINE_VERSION};
use crate::{InventoryStore, InventoryTx, StockDecrement};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    next_order_id: i64,
}

struct Inner {
    state: Mutex<State>,
    row_locks: Mutex<HashMap<ProductId, Arc<RowLock<()>>>>,
}

/// In-process [`InventoryStore`] with database-like transaction semantics.
#[derive(Clone)]
pub struct InMemoryInventoryStore {
    inner: Arc<Inner>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    next_order_id: 1,
                    ..State::default()
                }),
                row_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// A store pre-populated with the seed catalog.
    pub fn seeded() -> Self {
        let store = Self::new();
        {
            let mut state = store.inner.state.lock().unwrap();
            for s in seed::catalog() {
                state.products.insert(
                    s.id,
                    Product {
                        id: s.id,
                        name: s.name.to_string(),
                        stock: s.baseline_stock,
                        version: BASELINE_VERSION,
                    },
                );
            }
        }
        store
    }

    /// The product set is fixed after seeding, so existence is checked before
    /// a lock entry is created; probes for unknown ids leave no entry behind.
    fn row_lock(&self, id: ProductId) -> Result<Arc<RowLock<()>>, StoreError> {
        {
            let state = self.inner.state.lock().unwrap();
            if !state.products.contains_key(&id) {
                return Err(StoreError::NotFound);
            }
        }
        let mut locks = self.inner.row_locks.lock().unwrap();
        Ok(locks.entry(id).or_insert_with(|| Arc::new(RowLock::new(()))).clone())
    }
}

impl Default for InMemoryInventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn allocate_order(&self, order: &NewOrder) -> Order {
        let mut state = self.state.lock().unwrap();
        let id = OrderId::new(state.next_order_id);
        state.next_order_id += 1;
        Order {
            id,
            product_id: order.product_id,
            quantity: order.quantity,
            user_id: order.user_id.clone(),
            status: order.status,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    type Tx = InMemoryTx;

    async fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        let state = self.inner.state.lock().unwrap();
        state.products.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        let state = self.inner.state.lock().unwrap();
        state.orders.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn reset_product(&self, id: ProductId) -> Result<Product, StoreError> {
        let baseline = seed::baseline_for(id).ok_or(StoreError::NotFound)?;
        // A reset waits for in-flight writers, like an UPDATE would.
        let _guard = self.row_lock(id)?.lock_owned().await;
        let mut state = self.inner.state.lock().unwrap();
        let product = state.products.get_mut(&id).ok_or(StoreError::NotFound)?;
        product.stock = baseline.baseline_stock;
        product.version = BASELINE_VERSION;
        Ok(product.clone())
    }

    async fn reset_all(&self) -> Result<Vec<Product>, StoreError> {
        let mut out = Vec::with_capacity(seed::catalog().len());
        for s in seed::catalog() {
            out.push(self.reset_product(s.id).await?);
        }
        Ok(out)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let record = self.inner.allocate_order(&order);
        let mut state = self.inner.state.lock().unwrap();
        state.orders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn order_stats(&self, filter: &StatsFilter) -> Result<OrderStats, StoreError> {
        let state = self.inner.state.lock().unwrap();
        let mut stats = OrderStats::default();
        for order in state.orders.values() {
            if filter.matches(order.product_id, order.created_at) {
                stats.record(order.status, 1);
            }
        }
        Ok(stats)
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(InMemoryTx {
            store: self.clone(),
            guard: None,
            staged_product: None,
            staged_orders: Vec::new(),
        })
    }
}

/// Open transaction over [`InMemoryInventoryStore`].
///
/// Holds at most one row lock. Dropping without commit releases the lock and
/// discards staged writes.
pub struct InMemoryTx {
    store: InMemoryInventoryStore,
    guard: Option<OwnedMutexGuard<()>>,
    staged_product: Option<Product>,
    staged_orders: Vec<Order>,
}

#[async_trait]
impl InventoryTx for InMemoryTx {
    async fn lock_product(
        &mut self,
        id: ProductId,
        timeout: Duration,
    ) -> Result<Product, StoreError> {
        if self.guard.is_some() {
            return Err(StoreError::unavailable(
                "transaction already holds a row lock",
            ));
        }
        let lock = self.store.row_lock(id)?;
        let guard = tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout)?;

        let product = {
            let state = self.store.inner.state.lock().unwrap();
            state.products.get(&id).cloned()
        };
        let product = product.ok_or(StoreError::NotFound)?;

        self.guard = Some(guard);
        self.staged_product = Some(product.clone());
        Ok(product)
    }

    async fn decrement_stock_locked(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<StockDecrement, StoreError> {
        let staged = match self.staged_product.as_mut() {
            Some(p) if p.id == id && self.guard.is_some() => p,
            _ => {
                return Err(StoreError::unavailable(
                    "decrement_stock_locked without a held lock",
                ));
            }
        };
        if staged.stock < quantity {
            return Ok(StockDecrement::Insufficient);
        }
        staged.stock -= quantity;
        staged.version += 1;
        Ok(StockDecrement::Applied)
    }

    async fn conditional_decrement(
        &mut self,
        id: ProductId,
        quantity: i64,
        expected_version: i64,
    ) -> Result<u64, StoreError> {
        if self.guard.is_some() {
            return Err(StoreError::unavailable(
                "conditional_decrement inside a locking transaction",
            ));
        }
        // A conditional UPDATE waits on the row lock, then re-evaluates its
        // predicate against committed state. Missing row: 0 rows matched.
        let lock = match self.store.row_lock(id) {
            Ok(lock) => lock,
            Err(StoreError::NotFound) => return Ok(0),
            Err(err) => return Err(err),
        };
        let guard = lock.lock_owned().await;

        let current = {
            let state = self.store.inner.state.lock().unwrap();
            state.products.get(&id).cloned()
        };
        let Some(current) = current else {
            return Ok(0);
        };
        if current.version != expected_version || current.stock < quantity {
            return Ok(0);
        }

        let mut updated = current;
        updated.stock -= quantity;
        updated.version += 1;
        self.staged_product = Some(updated);
        // A successful update keeps the row lock until commit.
        self.guard = Some(guard);
        Ok(1)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        let record = self.store.inner.allocate_order(&order);
        self.staged_orders.push(record.clone());
        Ok(record)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let mut state = self.store.inner.state.lock().unwrap();
        if let Some(product) = self.staged_product.take() {
            state.products.insert(product.id, product);
        }
        for order in self.staged_orders.drain(..) {
            state.orders.insert(order.id, order);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        // Dropping releases the row lock and discards staged writes.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;
    use stockgate_core::OrderStatus;

    use super::*;

    const SUPER_WIDGET: ProductId = ProductId::new(1);

    fn new_order(status: OrderStatus) -> NewOrder {
        NewOrder {
            product_id: SUPER_WIDGET,
            quantity: 10,
            user_id: "user-1".to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn seeded_products_match_catalog() {
        let store = InMemoryInventoryStore::seeded();
        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.name, "Super Widget");
        assert_eq!(p.stock, 100);
        assert_eq!(p.version, BASELINE_VERSION);
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let store = InMemoryInventoryStore::seeded();
        assert_eq!(
            store.get_product(ProductId::new(999)).await.unwrap_err(),
            StoreError::NotFound
        );
    }

    #[tokio::test]
    async fn unknown_id_probes_leave_no_row_lock_entry() {
        let store = InMemoryInventoryStore::seeded();
        let ghost = ProductId::new(999);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.lock_product(ghost, Duration::from_millis(10)).await.unwrap_err(),
            StoreError::NotFound
        );
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.conditional_decrement(ghost, 1, 1).await.unwrap(), 0);
        drop(tx);

        assert!(store.inner.row_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_lock_times_out_while_first_is_held() {
        let store = InMemoryInventoryStore::seeded();

        let mut tx1 = store.begin().await.unwrap();
        tx1.lock_product(SUPER_WIDGET, Duration::from_secs(1))
            .await
            .unwrap();

        let mut tx2 = store.begin().await.unwrap();
        let err = tx2
            .lock_product(SUPER_WIDGET, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::LockTimeout);

        // Releasing the first lock lets the second through.
        tx1.rollback().await.unwrap();
        tx2.lock_product(SUPER_WIDGET, Duration::from_millis(100))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn locked_decrement_commits_stock_and_order_together() {
        let store = InMemoryInventoryStore::seeded();

        let mut tx = store.begin().await.unwrap();
        tx.lock_product(SUPER_WIDGET, Duration::from_secs(1))
            .await
            .unwrap();
        let outcome = tx.decrement_stock_locked(SUPER_WIDGET, 10).await.unwrap();
        assert_eq!(outcome, StockDecrement::Applied);
        let order = tx.insert_order(new_order(OrderStatus::Confirmed)).await.unwrap();

        // Nothing is visible before commit.
        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 100);
        assert_eq!(store.get_order(order.id).await.unwrap_err(), StoreError::NotFound);

        tx.commit().await.unwrap();

        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 90);
        assert_eq!(p.version, 2);
        assert_eq!(store.get_order(order.id).await.unwrap().status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = InMemoryInventoryStore::seeded();

        let mut tx = store.begin().await.unwrap();
        tx.lock_product(SUPER_WIDGET, Duration::from_secs(1))
            .await
            .unwrap();
        tx.decrement_stock_locked(SUPER_WIDGET, 30).await.unwrap();
        let order = tx.insert_order(new_order(OrderStatus::Confirmed)).await.unwrap();
        tx.rollback().await.unwrap();

        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 100);
        assert_eq!(p.version, 1);
        assert_eq!(store.get_order(order.id).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_state_unchanged() {
        let store = InMemoryInventoryStore::seeded();

        let mut tx = store.begin().await.unwrap();
        tx.lock_product(SUPER_WIDGET, Duration::from_secs(1))
            .await
            .unwrap();
        let outcome = tx.decrement_stock_locked(SUPER_WIDGET, 101).await.unwrap();
        assert_eq!(outcome, StockDecrement::Insufficient);
        tx.commit().await.unwrap();

        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 100);
        assert_eq!(p.version, 1);
    }

    #[tokio::test]
    async fn cas_with_stale_version_changes_nothing() {
        let store = InMemoryInventoryStore::seeded();

        let mut tx = store.begin().await.unwrap();
        let affected = tx.conditional_decrement(SUPER_WIDGET, 10, 99).await.unwrap();
        assert_eq!(affected, 0);
        tx.commit().await.unwrap();

        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 100);
        assert_eq!(p.version, 1);
    }

    #[tokio::test]
    async fn cas_with_current_version_applies_once() {
        let store = InMemoryInventoryStore::seeded();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.conditional_decrement(SUPER_WIDGET, 10, 1).await.unwrap(), 1);
        tx.commit().await.unwrap();

        // The same expected version is now stale.
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.conditional_decrement(SUPER_WIDGET, 10, 1).await.unwrap(), 0);
        tx.rollback().await.unwrap();

        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 90);
        assert_eq!(p.version, 2);
    }

    #[tokio::test]
    async fn reset_restores_baseline_regardless_of_prior_mutations() {
        let store = InMemoryInventoryStore::seeded();

        let mut tx = store.begin().await.unwrap();
        tx.conditional_decrement(SUPER_WIDGET, 40, 1).await.unwrap();
        tx.commit().await.unwrap();

        let p = store.reset_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 100);
        assert_eq!(p.version, BASELINE_VERSION);
    }

    #[tokio::test]
    async fn stats_reflect_only_committed_orders() {
        let store = InMemoryInventoryStore::seeded();

        store.insert_order(new_order(OrderStatus::Confirmed)).await.unwrap();
        store
            .insert_order(new_order(OrderStatus::RejectedConflict))
            .await
            .unwrap();

        // Staged but never committed.
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(new_order(OrderStatus::Confirmed)).await.unwrap();
        drop(tx);

        let stats = store.order_stats(&StatsFilter::default()).await.unwrap();
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.rejected_conflict, 1);
        assert_eq!(stats.total(), 2);
    }

    #[tokio::test]
    async fn stats_filter_by_product() {
        let store = InMemoryInventoryStore::seeded();
        store.insert_order(new_order(OrderStatus::Confirmed)).await.unwrap();
        store
            .insert_order(NewOrder {
                product_id: ProductId::new(2),
                quantity: 5,
                user_id: "user-2".to_string(),
                status: OrderStatus::Confirmed,
            })
            .await
            .unwrap();

        let filter = StatsFilter {
            product_id: Some(ProductId::new(2)),
            ..StatsFilter::default()
        };
        let stats = store.order_stats(&filter).await.unwrap();
        assert_eq!(stats.total(), 1);
    }

    #[tokio::test]
    async fn order_statuses_survive_the_wire_codes() {
        // Guard against drift between stored codes and the parser the
        // Postgres stats query relies on.
        let store = InMemoryInventoryStore::seeded();
        for status in OrderStatus::all() {
            let order = store.insert_order(new_order(status)).await.unwrap();
            let read = store.get_order(order.id).await.unwrap();
            assert_eq!(OrderStatus::from_str(read.status.as_str()).unwrap(), status);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Conservation: applying any sequence of CAS decrements leaves
        /// stock = 100 - sum(confirmed quantities) and
        /// version = 1 + count(confirmed).
        #[test]
        fn cas_sequence_conserves_stock_and_version(
            quantities in proptest::collection::vec(1i64..25, 1..40)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();

            let (product, confirmed, confirmed_qty) = rt.block_on(async move {
                let store = InMemoryInventoryStore::seeded();
                let mut confirmed = 0i64;
                let mut confirmed_qty = 0i64;
                for quantity in quantities {
                    let p = store.get_product(SUPER_WIDGET).await.unwrap();
                    if p.stock < quantity {
                        continue;
                    }
                    let mut tx = store.begin().await.unwrap();
                    let affected = tx
                        .conditional_decrement(SUPER_WIDGET, quantity, p.version)
                        .await
                        .unwrap();
                    assert_eq!(affected, 1);
                    tx.insert_order(NewOrder {
                        product_id: SUPER_WIDGET,
                        quantity,
                        user_id: "prop".to_string(),
                        status: OrderStatus::Confirmed,
                    })
                    .await
                    .unwrap();
                    tx.commit().await.unwrap();
                    confirmed += 1;
                    confirmed_qty += quantity;
                }
                let product = store.get_product(SUPER_WIDGET).await.unwrap();
                (product, confirmed, confirmed_qty)
            });

            prop_assert_eq!(product.stock, 100 - confirmed_qty);
            prop_assert_eq!(product.version, 1 + confirmed);
            prop_assert!(product.stock >= 0);
        }
    }
}
