//! `stockgate-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the product/order model, order outcome codes, and the stats
//! shapes the read side reports.

pub mod error;
pub mod id;
pub mod order;
pub mod product;
pub mod stats;

pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId};
pub use order::{NewOrder, Order, OrderStatus};
pub use product::Product;
pub use stats::{OrderStats, StatsFilter};
