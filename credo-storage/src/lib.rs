//! # credo-storage
//!
//! SQLite persistence layer: a single serialized write connection plus a
//! read-only pool (WAL), versioned migrations, and `SqliteTrustStore`
//! implementing the `TrustStore` trait.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod store;

pub use engine::StorageEngine;
pub use store::SqliteTrustStore;

use credo_core::errors::{CredoError, StorageError};

/// Wrap a low-level SQLite failure into the workspace error type.
pub(crate) fn to_storage_err(message: impl Into<String>) -> CredoError {
    CredoError::Storage(StorageError::SqliteError {
        message: message.into(),
    })
}
