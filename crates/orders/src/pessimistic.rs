//! Pessimistic strategy: exclusive row lock with a bounded wait.
//!
//! While the lock is held no other transaction can mutate the product's
//! stock, so the stock check and the decrement cannot race. The cost is
//! serialized throughput per product. Contenders proceed in lock-acquisition
//! order, which under contention need not match arrival order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use stockgate_core::{NewOrder, Order, OrderStatus};
use stockgate_store::{InventoryStore, InventoryTx, StockDecrement, StoreError};

use crate::{OrderPlacer, PlaceError, PlaceRequest};

pub struct PessimisticOrderService<S: InventoryStore> {
    store: Arc<S>,
    lock_timeout: Duration,
}

impl<S: InventoryStore> PessimisticOrderService<S> {
    pub fn new(store: Arc<S>, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
        }
    }
}

#[async_trait]
impl<S: InventoryStore> OrderPlacer for PessimisticOrderService<S> {
    fn strategy(&self) -> &'static str {
        "pessimistic"
    }

    async fn place(&self, request: PlaceRequest) -> Result<Order, PlaceError> {
        request.validate()?;
        let PlaceRequest {
            product_id,
            quantity,
            user_id,
        } = request;

        tracing::debug!(%product_id, %user_id, "pessimistic_lock_acquire_attempt");
        let mut tx = self.store.begin().await.map_err(PlaceError::from_store)?;

        let product = match tx.lock_product(product_id, self.lock_timeout).await {
            Ok(product) => product,
            Err(StoreError::LockTimeout) => {
                // The transaction is aborted at this point; the rejection
                // record goes through a fresh implicit transaction. Not
                // retried here; the caller may resubmit.
                tx.rollback().await.map_err(PlaceError::from_store)?;
                let order = self
                    .store
                    .insert_order(NewOrder {
                        product_id,
                        quantity,
                        user_id: user_id.clone(),
                        status: OrderStatus::RejectedLockTimeout,
                    })
                    .await
                    .map_err(PlaceError::from_store)?;
                tracing::warn!(%product_id, %user_id, order_id = %order.id, "pessimistic_lock_timeout");
                return Ok(order);
            }
            Err(StoreError::NotFound) => {
                tx.rollback().await.map_err(PlaceError::from_store)?;
                return Err(PlaceError::ProductNotFound);
            }
            Err(err) => return Err(PlaceError::from_store(err)),
        };

        // Lock held from here; dropping `tx` on any error path rolls back.
        let status = match tx
            .decrement_stock_locked(product_id, quantity)
            .await
            .map_err(PlaceError::from_store)?
        {
            StockDecrement::Applied => OrderStatus::Confirmed,
            StockDecrement::Insufficient => {
                tracing::info!(
                    %product_id,
                    %user_id,
                    stock = product.stock,
                    requested = quantity,
                    "pessimistic_insufficient_stock"
                );
                OrderStatus::RejectedInsufficientStock
            }
        };

        // Order record and stock mutation become durable together.
        let order = tx
            .insert_order(NewOrder {
                product_id,
                quantity,
                user_id: user_id.clone(),
                status,
            })
            .await
            .map_err(PlaceError::from_store)?;
        tx.commit().await.map_err(PlaceError::from_store)?;

        if status == OrderStatus::Confirmed {
            tracing::info!(%product_id, %user_id, order_id = %order.id, quantity, "pessimistic_order_confirmed");
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use stockgate_core::{OrderStatus, ProductId, StatsFilter};
    use stockgate_store::InMemoryInventoryStore;

    use super::*;

    const SUPER_WIDGET: ProductId = ProductId::new(1);

    fn service(
        store: &Arc<InMemoryInventoryStore>,
        lock_timeout: Duration,
    ) -> PessimisticOrderService<InMemoryInventoryStore> {
        PessimisticOrderService::new(Arc::clone(store), lock_timeout)
    }

    fn request(quantity: i64, user: &str) -> PlaceRequest {
        PlaceRequest {
            product_id: SUPER_WIDGET,
            quantity,
            user_id: user.to_string(),
        }
    }

    #[tokio::test]
    async fn confirms_and_decrements() {
        let store = Arc::new(InMemoryInventoryStore::seeded());
        let svc = service(&store, Duration::from_secs(1));
        assert_eq!(svc.strategy(), "pessimistic");

        let order = svc.place(request(10, "alice")).await.unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);

        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 90);
        assert_eq!(p.version, 2);
    }

    #[tokio::test]
    async fn rejects_insufficient_stock_without_mutation() {
        let store = Arc::new(InMemoryInventoryStore::seeded());
        let svc = service(&store, Duration::from_secs(1));

        let order = svc.place(request(101, "alice")).await.unwrap();
        assert_eq!(order.status, OrderStatus::RejectedInsufficientStock);

        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 100);
        assert_eq!(p.version, 1);

        // The rejection is recorded.
        let read = store.get_order(order.id).await.unwrap();
        assert_eq!(read.status, OrderStatus::RejectedInsufficientStock);
    }

    #[tokio::test]
    async fn rejects_invalid_request_before_touching_the_store() {
        let store = Arc::new(InMemoryInventoryStore::seeded());
        let svc = service(&store, Duration::from_secs(1));

        let err = svc.place(request(0, "alice")).await.unwrap_err();
        assert!(matches!(err, PlaceError::Validation(_)));

        let err = svc.place(request(1, "  ")).await.unwrap_err();
        assert!(matches!(err, PlaceError::Validation(_)));

        let stats = store.order_stats(&StatsFilter::default()).await.unwrap();
        assert_eq!(stats.total(), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_an_error_not_a_record() {
        let store = Arc::new(InMemoryInventoryStore::seeded());
        let svc = service(&store, Duration::from_secs(1));

        let err = svc
            .place(PlaceRequest {
                product_id: ProductId::new(999),
                quantity: 1,
                user_id: "alice".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, PlaceError::ProductNotFound);

        let stats = store.order_stats(&StatsFilter::default()).await.unwrap();
        assert_eq!(stats.total(), 0);
    }

    #[tokio::test]
    async fn lock_timeout_is_recorded_and_leaves_stock_unchanged() {
        let store = Arc::new(InMemoryInventoryStore::seeded());
        let svc = service(&store, Duration::from_millis(20));

        // A rival transaction holds the row for longer than lock_timeout.
        let mut rival = store.begin().await.unwrap();
        rival
            .lock_product(SUPER_WIDGET, Duration::from_secs(1))
            .await
            .unwrap();

        let order = svc.place(request(10, "alice")).await.unwrap();
        assert_eq!(order.status, OrderStatus::RejectedLockTimeout);

        rival.rollback().await.unwrap();

        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 100);
        assert_eq!(p.version, 1);

        let stats = store.order_stats(&StatsFilter::default()).await.unwrap();
        assert_eq!(stats.rejected_lock_timeout, 1);
    }

    #[tokio::test]
    async fn concurrent_contenders_never_oversell() {
        // Stock 100, quantity 10, 20 concurrent requests: exactly 10
        // confirmed, 10 rejected, stock 0, version 11.
        let store = Arc::new(InMemoryInventoryStore::seeded());
        let svc = Arc::new(service(&store, Duration::from_secs(5)));

        let mut handles = Vec::new();
        for i in 0..20 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                svc.place(request(10, &format!("user-{i}"))).await.unwrap()
            }));
        }

        let mut confirmed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap().status {
                OrderStatus::Confirmed => confirmed += 1,
                OrderStatus::RejectedInsufficientStock => rejected += 1,
                other => panic!("unexpected status: {other}"),
            }
        }
        assert_eq!(confirmed, 10);
        assert_eq!(rejected, 10);

        let p = store.get_product(SUPER_WIDGET).await.unwrap();
        assert_eq!(p.stock, 0);
        assert_eq!(p.version, 11);

        let stats = store.order_stats(&StatsFilter::default()).await.unwrap();
        assert_eq!(stats.confirmed, 10);
        assert_eq!(stats.rejected_insufficient_stock, 10);
        assert_eq!(stats.total(), 20);
    }
}
