use axum::Router;

use stockgate_store::InventoryStore;

pub mod orders;
pub mod products;
pub mod system;

/// Router for everything under `/api`.
pub fn router<S: InventoryStore + 'static>() -> Router {
    Router::new()
        .nest("/orders", orders::router::<S>())
        .nest("/products", products::router::<S>())
}
