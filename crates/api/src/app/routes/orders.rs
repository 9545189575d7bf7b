use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockgate_core::{OrderId, ProductId};
use stockgate_orders::{OrderPlacer, PlaceRequest};
use stockgate_store::InventoryStore;

use crate::app::{dto, errors, AppServices};

pub fn router<S: InventoryStore + 'static>() -> Router {
    Router::new()
        .route("/pessimistic", post(place_pessimistic::<S>))
        .route("/optimistic", post(place_optimistic::<S>))
        .route("/stats", get(order_stats::<S>))
        .route("/:id", get(get_order::<S>))
}

pub async fn place_pessimistic<S: InventoryStore + 'static>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    place(&services.pessimistic, body).await
}

pub async fn place_optimistic<S: InventoryStore + 'static>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    place(&services.optimistic, body).await
}

async fn place<P: OrderPlacer>(
    placer: &P,
    body: dto::PlaceOrderRequest,
) -> axum::response::Response {
    let request = PlaceRequest {
        product_id: ProductId::new(body.product_id),
        quantity: body.quantity,
        user_id: body.user_id,
    };
    tracing::debug!(strategy = placer.strategy(), product_id = request.product_id.as_i64(), "order_attempt");
    match placer.place(request).await {
        Ok(order) => (
            errors::order_status_code(order.status),
            Json(dto::placed_to_json(&order)),
        )
            .into_response(),
        Err(err) => errors::place_error_to_response(err),
    }
}

pub async fn get_order<S: InventoryStore + 'static>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id");
        }
    };
    match services.store.get_order(id).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(err) => errors::store_error_to_response(err),
    }
}

pub async fn order_stats<S: InventoryStore + 'static>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Query(query): Query<dto::StatsQuery>,
) -> axum::response::Response {
    match services.stats.summarize(&query.into_filter()).await {
        Ok(stats) => (StatusCode::OK, Json(dto::stats_to_json(&stats))).into_response(),
        Err(err) => errors::store_error_to_response(err),
    }
}
