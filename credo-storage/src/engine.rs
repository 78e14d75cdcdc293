//! StorageEngine — opens the pool, runs migrations, hands out the store.

use std::path::Path;
use std::sync::Arc;

use credo_core::errors::CredoResult;
use tracing::debug;

use crate::migrations::run_migrations;
use crate::pool::{ConnectionPool, ReadPool};
use crate::store::SqliteTrustStore;

/// Owns the connection pool and the migrated schema.
pub struct StorageEngine {
    pool: Arc<ConnectionPool>,
}

impl StorageEngine {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn open(path: &Path) -> CredoResult<Self> {
        let pool = ConnectionPool::open(path, ReadPool::default_size())?;
        pool.writer.with_conn_sync(run_migrations)?;
        debug!(path = %path.display(), "storage engine opened");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Open an in-memory engine (for testing).
    pub fn open_in_memory() -> CredoResult<Self> {
        let pool = ConnectionPool::open_in_memory()?;
        pool.writer.with_conn_sync(run_migrations)?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// A `TrustStore` handle over this engine.
    pub fn trust_store(&self) -> SqliteTrustStore {
        SqliteTrustStore::new(self.pool.clone())
    }
}
