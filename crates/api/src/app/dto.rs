use chrono::{DateTime, Utc};
use serde::Deserialize;

use stockgate_core::{Order, OrderStats, OrderStatus, Product, ProductId, StatsFilter};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub product_id: i64,
    pub quantity: i64,
    pub user_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub product_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl StatsQuery {
    pub fn into_filter(self) -> StatsFilter {
        StatsFilter {
            product_id: self.product_id.map(ProductId::new),
            since: self.since,
            until: self.until,
        }
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

/// Placement response: just the record id and its terminal status.
pub fn placed_to_json(order: &Order) -> serde_json::Value {
    serde_json::json!({
        "orderId": order.id.as_i64(),
        "status": order.status.as_str(),
    })
}

pub fn order_to_json(order: &Order) -> serde_json::Value {
    serde_json::json!({
        "id": order.id.as_i64(),
        "productId": order.product_id.as_i64(),
        "quantityOrdered": order.quantity,
        "userId": order.user_id,
        "status": order.status.as_str(),
        "createdAt": order.created_at.to_rfc3339(),
    })
}

pub fn product_to_json(product: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": product.id.as_i64(),
        "name": product.name,
        "stock": product.stock,
        "version": product.version,
    })
}

pub fn stats_to_json(stats: &OrderStats) -> serde_json::Value {
    let mut by_status = serde_json::Map::new();
    for status in OrderStatus::all() {
        by_status.insert(status.as_str().to_string(), stats.count(status).into());
    }
    serde_json::json!({
        "total": stats.total(),
        "byStatus": by_status,
    })
}
