//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};

use credo_core::errors::CredoResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// Manages the single write connection and the read connection pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub readers: ReadPool,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a connection pool for the given database file.
    pub fn open(path: &Path, read_pool_size: usize) -> CredoResult<Self> {
        let writer = WriteConnection::open(path)?;
        let readers = ReadPool::open(path, read_pool_size)?;
        Ok(Self {
            writer,
            readers,
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory connection pool (for testing).
    ///
    /// In-memory mode has no shared file, so reads are routed through the
    /// writer; the read pool stays empty.
    pub fn open_in_memory() -> CredoResult<Self> {
        let writer = WriteConnection::open_in_memory()?;
        Ok(Self {
            writer,
            readers: ReadPool::empty(),
            db_path: None,
        })
    }

    /// Run a read-only closure, preferring the read pool when file-backed.
    pub fn with_read<F, T>(&self, f: F) -> CredoResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> CredoResult<T>,
    {
        if self.db_path.is_some() && self.readers.size() > 0 {
            self.readers.with_conn(f)
        } else {
            self.writer.with_conn_sync(f)
        }
    }
}
