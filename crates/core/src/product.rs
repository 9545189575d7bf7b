//! Product model.

use serde::{Deserialize, Serialize};

use crate::id::ProductId;

/// A product row as read from the store.
///
/// Invariants enforced at the storage boundary:
/// - `stock` is never negative (CHECK constraint),
/// - `version` starts at 1 and increments exactly when `stock` mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub stock: i64,
    pub version: i64,
}

impl Product {
    /// Whether current stock covers `quantity`.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}
