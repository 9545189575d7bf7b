//! `stockgate-orders`: the two order-placement strategies.
//!
//! Both services implement [`OrderPlacer`]: same input/output contract,
//! different algorithm underneath. [`PessimisticOrderService`] serializes
//! contenders with an exclusive row lock and a bounded wait;
//! [`OptimisticOrderService`] never blocks, using a version-counter CAS with
//! bounded retry and exponential backoff. Neither holds state of its own;
//! every retry re-reads the store, so multiple service instances can run
//! against the same database.

use async_trait::async_trait;
use thiserror::Error;

use stockgate_core::{DomainError, Order, ProductId};
use stockgate_store::StoreError;

pub mod backoff;
pub mod optimistic;
pub mod pessimistic;
pub mod stats;

pub use optimistic::OptimisticOrderService;
pub use pessimistic::PessimisticOrderService;
pub use stats::StatsAggregator;

/// An inbound order attempt. Validated before either strategy runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub user_id: String,
}

impl PlaceRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if self.user_id.trim().is_empty() {
            return Err(DomainError::validation("user_id cannot be empty"));
        }
        Ok(())
    }
}

/// Failures that do not produce a terminal order record.
///
/// Rejections (insufficient stock, conflict exhaustion, lock timeout) are
/// not errors here; they come back as an [`Order`] carrying the rejection
/// status.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaceError {
    #[error("invalid order request: {0}")]
    Validation(String),

    #[error("product not found")]
    ProductNotFound,

    /// The store could not be reached; the attempt is not recorded.
    #[error("store unavailable: {0}")]
    Store(String),
}

impl PlaceError {
    pub(crate) fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PlaceError::ProductNotFound,
            // A lock timeout escaping a service is a protocol bug; surface
            // it as a store failure rather than mislabeling the outcome.
            StoreError::LockTimeout => PlaceError::Store("unexpected lock timeout".to_string()),
            StoreError::Unavailable(msg) => PlaceError::Store(msg),
        }
    }
}

impl From<DomainError> for PlaceError {
    fn from(err: DomainError) -> Self {
        PlaceError::Validation(err.to_string())
    }
}

/// One strategy for turning an order attempt into a terminal, recorded
/// outcome.
#[async_trait]
pub trait OrderPlacer: Send + Sync {
    /// Short name for logs and metrics ("pessimistic" / "optimistic").
    fn strategy(&self) -> &'static str;

    /// Drive the attempt to a terminal decision. The returned [`Order`] is
    /// the durable record; its status says whether stock was taken.
    async fn place(&self, request: PlaceRequest) -> Result<Order, PlaceError>;
}
