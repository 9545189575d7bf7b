//! Read-only summarization of order outcomes.

use std::sync::Arc;

use stockgate_core::{OrderStats, ProductId, StatsFilter};
use stockgate_store::{InventoryStore, StoreError};

/// Counts terminal order outcomes by status, optionally narrowed by product
/// or time window. No write side effects; only committed orders are visible
/// (the store's transaction discipline guarantees no dirty reads).
pub struct StatsAggregator<S: InventoryStore> {
    store: Arc<S>,
}

impl<S: InventoryStore> StatsAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn summarize(&self, filter: &StatsFilter) -> Result<OrderStats, StoreError> {
        self.store.order_stats(filter).await
    }

    /// Convenience: totals for a single product over all time.
    pub async fn for_product(&self, product_id: ProductId) -> Result<OrderStats, StoreError> {
        self.summarize(&StatsFilter {
            product_id: Some(product_id),
            ..StatsFilter::default()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use stockgate_core::{NewOrder, OrderStatus};
    use stockgate_store::InMemoryInventoryStore;

    use super::*;

    #[tokio::test]
    async fn summarizes_by_status_and_product() {
        let store = Arc::new(InMemoryInventoryStore::seeded());
        for (product, status) in [
            (1, OrderStatus::Confirmed),
            (1, OrderStatus::Confirmed),
            (1, OrderStatus::RejectedLockTimeout),
            (2, OrderStatus::RejectedConflict),
        ] {
            store
                .insert_order(NewOrder {
                    product_id: ProductId::new(product),
                    quantity: 1,
                    user_id: "u".to_string(),
                    status,
                })
                .await
                .unwrap();
        }

        let aggregator = StatsAggregator::new(Arc::clone(&store));

        let all = aggregator.summarize(&StatsFilter::default()).await.unwrap();
        assert_eq!(all.confirmed, 2);
        assert_eq!(all.rejected_lock_timeout, 1);
        assert_eq!(all.rejected_conflict, 1);
        assert_eq!(all.total(), 4);

        let widget_only = aggregator.for_product(ProductId::new(1)).await.unwrap();
        assert_eq!(widget_only.total(), 3);
        assert_eq!(widget_only.rejected_conflict, 0);
    }
}
