//! Order outcome summaries (read side).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ProductId;
use crate::order::OrderStatus;

/// Counts of terminal order outcomes, by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub confirmed: u64,
    pub rejected_insufficient_stock: u64,
    pub rejected_conflict: u64,
    pub rejected_lock_timeout: u64,
    pub failed: u64,
}

impl OrderStats {
    pub fn total(&self) -> u64 {
        self.confirmed
            + self.rejected_insufficient_stock
            + self.rejected_conflict
            + self.rejected_lock_timeout
            + self.failed
    }

    pub fn count(&self, status: OrderStatus) -> u64 {
        match status {
            OrderStatus::Confirmed => self.confirmed,
            OrderStatus::RejectedInsufficientStock => self.rejected_insufficient_stock,
            OrderStatus::RejectedConflict => self.rejected_conflict,
            OrderStatus::RejectedLockTimeout => self.rejected_lock_timeout,
            OrderStatus::Failed => self.failed,
        }
    }

    pub fn record(&mut self, status: OrderStatus, count: u64) {
        match status {
            OrderStatus::Confirmed => self.confirmed += count,
            OrderStatus::RejectedInsufficientStock => self.rejected_insufficient_stock += count,
            OrderStatus::RejectedConflict => self.rejected_conflict += count,
            OrderStatus::RejectedLockTimeout => self.rejected_lock_timeout += count,
            OrderStatus::Failed => self.failed += count,
        }
    }
}

/// Optional narrowing of a stats query.
///
/// `since` is inclusive, `until` exclusive. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsFilter {
    pub product_id: Option<ProductId>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl StatsFilter {
    pub fn matches(&self, product_id: ProductId, created_at: DateTime<Utc>) -> bool {
        if let Some(p) = self.product_id {
            if p != product_id {
                return false;
            }
        }
        if let Some(since) = self.since {
            if created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if created_at >= until {
                return false;
            }
        }
        true
    }
}
