//! Store error model.

use thiserror::Error;

/// Failure conditions of the storage layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced row does not exist.
    #[error("not found")]
    NotFound,

    /// An exclusive row lock could not be acquired within the bounded wait.
    #[error("lock timeout")]
    LockTimeout,

    /// The store itself could not be reached or misbehaved. Fatal to the
    /// current request; never retried by the store.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
