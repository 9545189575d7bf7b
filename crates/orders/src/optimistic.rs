//! Optimistic strategy: version-counter CAS with bounded retry/backoff.
//!
//! No lock is ever held across the decision. Each attempt re-reads the
//! product, then issues the conditional decrement keyed on the version it
//! read; a concurrent writer makes the CAS miss (0 rows), which costs a
//! backoff sleep and a retry. Attempts are bounded, so every request reaches
//! a terminal status.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use stockgate_core::{NewOrder, Order, OrderStatus};
use stockgate_store::{InventoryStore, InventoryTx, StoreError};

use crate::backoff::backoff_delay;
use crate::{OrderPlacer, PlaceError, PlaceRequest};

pub struct OptimisticOrderService<S: InventoryStore> {
    store: Arc<S>,
    max_attempts: u32,
    base_backoff: Duration,
}

impl<S: InventoryStore> OptimisticOrderService<S> {
    pub fn new(store: Arc<S>, max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            store,
            // A zero budget would terminate before the first CAS.
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }
}

#[async_trait]
impl<S: InventoryStore> OrderPlacer for OptimisticOrderService<S> {
    fn strategy(&self) -> &'static str {
        "optimistic"
    }

    async fn place(&self, request: PlaceRequest) -> Result<Order, PlaceError> {
        request.validate()?;
        let PlaceRequest {
            product_id,
            quantity,
            user_id,
        } = request;

        let mut attempt: u32 = 0;
        loop {
            // Fresh, unlocked read.
            let product = match self.store.get_product(product_id).await {
                Ok(product) => product,
                Err(StoreError::NotFound) => return Err(PlaceError::ProductNotFound),
                Err(err) => return Err(PlaceError::from_store(err)),
            };

            // Insufficient stock is terminal from this read's perspective;
            // a later user request will re-check fresh state.
            if !product.can_fulfill(quantity) {
                tracing::info!(
                    %product_id,
                    %user_id,
                    stock = product.stock,
                    requested = quantity,
                    "optimistic_insufficient_stock"
                );
                let order = self
                    .store
                    .insert_order(NewOrder {
                        product_id,
                        quantity,
                        user_id: user_id.clone(),
                        status: OrderStatus::RejectedInsufficientStock,
                    })
                    .await
                    .map_err(PlaceError::from_store)?;
                return Ok(order);
            }

            let mut tx = self.store.begin().await.map_err(PlaceError::from_store)?;
            let affected = tx
                .conditional_decrement(product_id, quantity, product.version)
                .await
                .map_err(PlaceError::from_store)?;

            if affected == 1 {
                // Confirmation commits together with the stock mutation.
                let order = tx
                    .insert_order(NewOrder {
                        product_id,
                        quantity,
                        user_id: user_id.clone(),
                        status: OrderStatus::Confirmed,
                    })
                    .await
                    .map_err(PlaceError::from_store)?;
                tx.commit().await.map_err(PlaceError::from_store)?;
                tracing::info!(
                    %product_id,
                    %user_id,
                    order_id = %order.id,
                    quantity,
                    attempts = attempt + 1,
                    "optimistic_order_confirmed"
                );
                return Ok(order);
            }

            // CAS missed: someone changed the row between read and write.
            tx.rollback().await.map_err(PlaceError::from_store)?;
            attempt += 1;
            if attempt >= self.max_attempts {
                let order = self
                    .store
                    .insert_order(NewOrder {
                        product_id,
                        quantity,
                        user_id: user_id.clone(),
                        status: OrderStatus::RejectedConflict,
                    })
                    .await
                    .map_err(PlaceError::from_store)?;
                tracing::warn!(
                    %product_id,
                    %user_id,
                    order_id = %order.id,
                    attempts = attempt,
                    "optimistic_conflict_exhausted"
                );
                return Ok(order);
            }

            let delay = backoff_delay(self.base_backoff, attempt);
            tracing::debug!(
                %product_id,
                %user_id,
                attempt,
                backoff_ms = delay.as_millis() as u64,
                "optimistic_conflict_retry"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
