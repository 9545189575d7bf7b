//! HTTP API application wiring (Axum router + service wiring).
//!
//! Structure:
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses
//!
//! The router is generic over the store so black-box tests can run the exact
//! production routing tree against the in-memory store.

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use stockgate_orders::{OptimisticOrderService, PessimisticOrderService, StatsAggregator};
use stockgate_store::InventoryStore;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Everything the handlers need, injected as one `Extension`.
pub struct AppServices<S: InventoryStore> {
    pub store: Arc<S>,
    pub pessimistic: PessimisticOrderService<S>,
    pub optimistic: OptimisticOrderService<S>,
    pub stats: StatsAggregator<S>,
}

impl<S: InventoryStore> AppServices<S> {
    pub fn new(store: Arc<S>, config: &ApiConfig) -> Self {
        Self {
            pessimistic: PessimisticOrderService::new(Arc::clone(&store), config.lock_timeout),
            optimistic: OptimisticOrderService::new(
                Arc::clone(&store),
                config.max_attempts,
                config.base_backoff,
            ),
            stats: StatsAggregator::new(Arc::clone(&store)),
            store,
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app<S>(services: Arc<AppServices<S>>) -> Router
where
    S: InventoryStore + 'static,
{
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router::<S>())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::log_requests))
                .layer(Extension(services)),
        )
}
