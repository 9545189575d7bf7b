//! Order model and terminal outcome codes.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::{OrderId, ProductId};

/// Terminal outcome of an order attempt.
///
/// Every attempt that reaches a decision is recorded with exactly one of
/// these. `Failed` exists in the schema for completeness but the order
/// services never write it: store-unavailable attempts leave no row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Confirmed,
    RejectedInsufficientStock,
    RejectedConflict,
    RejectedLockTimeout,
    Failed,
}

impl OrderStatus {
    /// Stable wire/storage code for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::RejectedInsufficientStock => "rejected_insufficient_stock",
            OrderStatus::RejectedConflict => "rejected_conflict",
            OrderStatus::RejectedLockTimeout => "rejected_lock_timeout",
            OrderStatus::Failed => "failed",
        }
    }

    /// All statuses, in reporting order.
    pub fn all() -> [OrderStatus; 5] {
        [
            OrderStatus::Confirmed,
            OrderStatus::RejectedInsufficientStock,
            OrderStatus::RejectedConflict,
            OrderStatus::RejectedLockTimeout,
            OrderStatus::Failed,
        ]
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(OrderStatus::Confirmed),
            "rejected_insufficient_stock" => Ok(OrderStatus::RejectedInsufficientStock),
            "rejected_conflict" => Ok(OrderStatus::RejectedConflict),
            "rejected_lock_timeout" => Ok(OrderStatus::RejectedLockTimeout),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(DomainError::validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// An order row as read from the store. Insert-only; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub user_id: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new order record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub product_id: ProductId,
    pub quantity: i64,
    pub user_id: String,
    pub status: OrderStatus,
}
