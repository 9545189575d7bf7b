//! `stockgate-store`: transactional persistence of product stock/version and
//! order records.
//!
//! This is the only crate that talks to durable storage. All cross-request
//! coordination lives here, delegated to the store's transactional
//! primitives (row locks, atomic conditional updates) so correctness holds
//! even with multiple service instances against the same database.
//!
//! Two implementations share the same pair of traits:
//! - [`PgInventoryStore`]: Postgres via sqlx, the production store,
//! - [`InMemoryInventoryStore`]: an in-process double with the same locking
//!   and commit semantics, used by tests and local development.

use std::time::Duration;

use async_trait::async_trait;

use stockgate_core::{NewOrder, Order, OrderId, OrderStats, Product, ProductId, StatsFilter};

pub mod error;
pub mod in_memory;
pub mod postgres;
pub mod seed;

pub use error::StoreError;
pub use in_memory::InMemoryInventoryStore;
pub use postgres::PgInventoryStore;
pub use seed::{SeedProduct, BASELINE_VERSION};

/// Outcome of a stock decrement attempted under an exclusive row lock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockDecrement {
    /// Stock covered the quantity; it was decremented and `version` bumped.
    Applied,
    /// Stock was short; nothing changed.
    Insufficient,
}

/// Pool-scoped store operations.
///
/// Methods here run in their own (implicit) transaction. Multi-statement
/// work goes through [`InventoryStore::begin`] and the [`InventoryTx`]
/// handle it returns.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    type Tx: InventoryTx;

    async fn get_product(&self, id: ProductId) -> Result<Product, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Order, StoreError>;

    /// Restore one seeded product to its baseline stock/version,
    /// unconditionally overwriting the current values.
    async fn reset_product(&self, id: ProductId) -> Result<Product, StoreError>;

    /// Restore every seeded product to its baseline.
    async fn reset_all(&self) -> Result<Vec<Product>, StoreError>;

    /// Append an order record in its own transaction.
    ///
    /// Used for rejection records that are decided outside a data
    /// transaction (lock timeout, conflict exhaustion, stale-read
    /// insufficiency).
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Count committed orders by status, optionally narrowed by product or
    /// time window. In-flight (uncommitted) attempts are never visible.
    async fn order_stats(&self, filter: &StatsFilter) -> Result<OrderStats, StoreError>;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// A single open transaction against the store.
///
/// Dropping the handle without [`InventoryTx::commit`] rolls everything back
/// and releases any held row lock, so a cancelled request cannot leave a
/// lock held or a partial stock mutation durable.
#[async_trait]
pub trait InventoryTx: Send {
    /// Take an exclusive row lock on the product, waiting up to `timeout`.
    ///
    /// On success the lock is held until the transaction ends. Errors:
    /// [`StoreError::LockTimeout`] if the wait expires,
    /// [`StoreError::NotFound`] if the product does not exist.
    async fn lock_product(
        &mut self,
        id: ProductId,
        timeout: Duration,
    ) -> Result<Product, StoreError>;

    /// Within an already-locked transaction: if `stock >= quantity`,
    /// decrement stock and bump version; otherwise leave state unchanged.
    async fn decrement_stock_locked(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<StockDecrement, StoreError>;

    /// The compare-and-swap primitive: atomically decrement stock and bump
    /// version only if the current version equals `expected_version` and
    /// stock covers `quantity`. Returns the number of rows changed (0 or 1).
    async fn conditional_decrement(
        &mut self,
        id: ProductId,
        quantity: i64,
        expected_version: i64,
    ) -> Result<u64, StoreError>;

    /// Append an order record inside this transaction, so it becomes durable
    /// together with the stock mutation or not at all.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
