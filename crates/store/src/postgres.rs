//! Postgres-backed inventory store.
//!
//! Thin SQL mapping over the [`InventoryStore`]/[`InventoryTx`] traits. The
//! locking discipline is entirely the database's: `SELECT ... FOR UPDATE`
//! bounded by `SET LOCAL lock_timeout` on the pessimistic path, and a single
//! conditional `UPDATE` keyed on the version counter as the CAS primitive.
//!
//! ## Thread safety
//!
//! Uses the sqlx connection pool (Arc + Send + Sync). A dropped
//! [`PgInventoryTx`] rolls back via sqlx's `Transaction` drop semantics, so
//! cancelled requests leave no lock held and no partial mutation durable.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};

use stockgate_core::{
    NewOrder, Order, OrderId, OrderStats, OrderStatus, Product, ProductId, StatsFilter,
};

use crate::error::StoreError;
use crate::seed::{self, BASELINE_VERSION};
use crate::{InventoryStore, InventoryTx, StockDecrement};

/// Embedded schema migrations (`crates/store/migrations/`).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Production [`InventoryStore`] over a Postgres pool.
#[derive(Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool, run migrations, and seed the catalog (idempotent).
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(map_sqlx)?;

        let store = Self::new(pool);
        store.migrate().await?;
        store.seed().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable(format!("migration failed: {e}")))
    }

    /// Insert the seed catalog, leaving existing rows untouched.
    pub async fn seed(&self) -> Result<(), StoreError> {
        for s in seed::catalog() {
            sqlx::query(
                "INSERT INTO products (id, name, stock, version) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(s.id.as_i64())
            .bind(s.name)
            .bind(s.baseline_stock)
            .bind(BASELINE_VERSION)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        }
        // Seeding uses explicit ids; keep the sequence ahead of them.
        sqlx::query("SELECT setval('products_id_seq', (SELECT MAX(id) FROM products))")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    type Tx = PgInventoryTx;

    async fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query("SELECT id, name, stock, version FROM products WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(product_from_row).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        let row = sqlx::query(
            "SELECT id, product_id, quantity_ordered, user_id, status, created_at \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.as_ref().map(order_from_row).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn reset_product(&self, id: ProductId) -> Result<Product, StoreError> {
        let baseline = seed::baseline_for(id).ok_or(StoreError::NotFound)?;
        let row = sqlx::query(
            "UPDATE products SET stock = $2, version = $3 WHERE id = $1 \
             RETURNING id, name, stock, version",
        )
        .bind(id.as_i64())
        .bind(baseline.baseline_stock)
        .bind(BASELINE_VERSION)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.as_ref().map(product_from_row).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn reset_all(&self) -> Result<Vec<Product>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let mut out = Vec::with_capacity(seed::catalog().len());
        for s in seed::catalog() {
            let row = sqlx::query(
                "UPDATE products SET stock = $2, version = $3 WHERE id = $1 \
                 RETURNING id, name, stock, version",
            )
            .bind(s.id.as_i64())
            .bind(s.baseline_stock)
            .bind(BASELINE_VERSION)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx)?;
            if let Some(row) = row {
                out.push(product_from_row(&row)?);
            }
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(out)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        insert_order_with(&self.pool, &order).await
    }

    async fn order_stats(&self, filter: &StatsFilter) -> Result<OrderStats, StoreError> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM orders \
             WHERE ($1::bigint IS NULL OR product_id = $1) \
               AND ($2::timestamptz IS NULL OR created_at >= $2) \
               AND ($3::timestamptz IS NULL OR created_at < $3) \
             GROUP BY status",
        )
        .bind(filter.product_id.map(|p| p.as_i64()))
        .bind(filter.since)
        .bind(filter.until)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut stats = OrderStats::default();
        for row in &rows {
            let code: String = get_col(row, "status")?;
            let n: i64 = get_col(row, "n")?;
            match OrderStatus::from_str(&code) {
                Ok(status) => stats.record(status, n as u64),
                Err(_) => tracing::warn!(status = %code, "skipping unknown order status"),
            }
        }
        Ok(stats)
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await.map_err(map_sqlx)?;
        Ok(PgInventoryTx { tx })
    }
}

/// Open Postgres transaction. Dropped without commit → rollback.
pub struct PgInventoryTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InventoryTx for PgInventoryTx {
    async fn lock_product(
        &mut self,
        id: ProductId,
        timeout: Duration,
    ) -> Result<Product, StoreError> {
        // lock_timeout takes no bind parameter; millis are formatted in.
        let set_timeout = format!(
            "SET LOCAL lock_timeout = '{}ms'",
            timeout.as_millis().max(1)
        );
        sqlx::query(&set_timeout)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        let row = sqlx::query(
            "SELECT id, name, stock, version FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        row.as_ref().map(product_from_row).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn decrement_stock_locked(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<StockDecrement, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $1, version = version + 1 \
             WHERE id = $2 AND stock >= $1",
        )
        .bind(quantity)
        .bind(id.as_i64())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 1 {
            Ok(StockDecrement::Applied)
        } else {
            Ok(StockDecrement::Insufficient)
        }
    }

    async fn conditional_decrement(
        &mut self,
        id: ProductId,
        quantity: i64,
        expected_version: i64,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $1, version = version + 1 \
             WHERE id = $2 AND version = $3 AND stock >= $1",
        )
        .bind(quantity)
        .bind(id.as_i64())
        .bind(expected_version)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        insert_order_with(&mut *self.tx, &order).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(map_sqlx)
    }
}

async fn insert_order_with<'e, E>(executor: E, order: &NewOrder) -> Result<Order, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query(
        "INSERT INTO orders (product_id, quantity_ordered, user_id, status) \
         VALUES ($1, $2, $3, $4) RETURNING id, created_at",
    )
    .bind(order.product_id.as_i64())
    .bind(order.quantity)
    .bind(&order.user_id)
    .bind(order.status.as_str())
    .fetch_one(executor)
    .await
    .map_err(map_sqlx)?;

    Ok(Order {
        id: OrderId::new(get_col(&row, "id")?),
        product_id: order.product_id,
        quantity: order.quantity,
        user_id: order.user_id.clone(),
        status: order.status,
        created_at: get_col(&row, "created_at")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId::new(get_col(row, "id")?),
        name: get_col(row, "name")?,
        stock: get_col(row, "stock")?,
        version: get_col(row, "version")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let code: String = get_col(row, "status")?;
    let status = OrderStatus::from_str(&code)
        .map_err(|e| StoreError::unavailable(format!("bad status column: {e}")))?;
    Ok(Order {
        id: OrderId::new(get_col(row, "id")?),
        product_id: ProductId::new(get_col(row, "product_id")?),
        quantity: get_col(row, "quantity_ordered")?,
        user_id: get_col(row, "user_id")?,
        status,
        created_at: get_col(row, "created_at")?,
    })
}

fn get_col<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::unavailable(format!("column {name}: {e}")))
}

/// Map driver errors, distinguishing bounded-wait lock failures.
///
/// 55P03 is `lock_not_available` (raised by `lock_timeout`); 57014 is
/// `query_canceled` (raised by `statement_timeout`, kept for operators who
/// bound waits that way instead).
fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if let Some(code) = db.code() {
            if code == "55P03" || code == "57014" {
                return StoreError::LockTimeout;
            }
        }
    }
    StoreError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_catalog_is_stable() {
        let catalog = seed::catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].name, "Super Widget");
        assert_eq!(catalog[0].baseline_stock, 100);
        assert_eq!(catalog[1].name, "Mega Gadget");
        assert_eq!(catalog[1].baseline_stock, 50);
    }
}
