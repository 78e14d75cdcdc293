//! The single write connection.
//!
//! Every mutation in the workspace funnels through this mutex — the
//! serialized-writer discipline that keeps concurrent protocol updates to
//! the same peer's record from interleaving.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use credo_core::errors::{CredoError, CredoResult, StorageError};

use super::pragmas::apply_pragmas;
use crate::to_storage_err;

/// The sole connection allowed to mutate the database.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open the write connection to the given database path.
    pub fn open(path: &Path) -> CredoResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory write connection (for testing).
    pub fn open_in_memory() -> CredoResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a closure while holding the writer lock.
    pub fn with_conn_sync<F, T>(&self, f: F) -> CredoResult<T>
    where
        F: FnOnce(&Connection) -> CredoResult<T>,
    {
        let guard = self.conn.lock().map_err(|e| {
            CredoError::Storage(StorageError::LockPoisoned {
                message: e.to_string(),
            })
        })?;
        f(&guard)
    }
}
