use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockgate_core::ProductId;
use stockgate_store::InventoryStore;

use crate::app::{dto, errors, AppServices};

pub fn router<S: InventoryStore + 'static>() -> Router {
    Router::new()
        .route("/reset", post(reset_products::<S>))
        .route("/:id", get(get_product::<S>))
}

pub async fn get_product<S: InventoryStore + 'static>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };
    match services.store.get_product(id).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(err) => errors::store_error_to_response(err),
    }
}

/// Restore every seeded product to its baseline stock/version.
pub async fn reset_products<S: InventoryStore + 'static>(
    Extension(services): Extension<Arc<AppServices<S>>>,
) -> axum::response::Response {
    match services.store.reset_all().await {
        Ok(products) => {
            tracing::info!(count = products.len(), "products_reset");
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "message": "Product inventory reset successfully.",
                    "products": products.iter().map(dto::product_to_json).collect::<Vec<_>>(),
                })),
            )
                .into_response()
        }
        Err(err) => errors::store_error_to_response(err),
    }
}
