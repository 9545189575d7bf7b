use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockgate_core::OrderStatus;
use stockgate_orders::PlaceError;
use stockgate_store::StoreError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn place_error_to_response(err: PlaceError) -> axum::response::Response {
    match err {
        PlaceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        PlaceError::ProductNotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "product not found")
        }
        PlaceError::Store(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_unavailable", msg)
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::LockTimeout => json_error(StatusCode::CONFLICT, "lock_timeout", "lock timeout"),
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_unavailable", msg)
        }
    }
}

/// HTTP code for a recorded terminal outcome. The body always carries the
/// order id and status; the code just distinguishes the rejection class.
pub fn order_status_code(status: OrderStatus) -> StatusCode {
    match status {
        OrderStatus::Confirmed => StatusCode::OK,
        OrderStatus::RejectedInsufficientStock => StatusCode::BAD_REQUEST,
        OrderStatus::RejectedConflict | OrderStatus::RejectedLockTimeout => StatusCode::CONFLICT,
        OrderStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
