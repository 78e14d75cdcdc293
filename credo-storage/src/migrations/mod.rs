//! Versioned schema migrations, tracked via `PRAGMA user_version`.

pub mod v001_trust_tables;
pub mod v002_verdict_tables;

use rusqlite::Connection;
use tracing::info;

use credo_core::errors::{CredoError, CredoResult, StorageError};

use crate::to_storage_err;

/// Latest schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Apply all pending migrations, in order.
pub fn run_migrations(conn: &Connection) -> CredoResult<()> {
    let current = user_version(conn)?;

    for version in (current + 1)..=SCHEMA_VERSION {
        let result = match version {
            1 => v001_trust_tables::migrate(conn),
            2 => v002_verdict_tables::migrate(conn),
            _ => unreachable!("no migration registered for version {version}"),
        };
        result.map_err(|e| {
            CredoError::Storage(StorageError::MigrationFailed {
                version,
                reason: e.to_string(),
            })
        })?;
        set_user_version(conn, version)?;
        info!(version, "applied schema migration");
    }

    Ok(())
}

fn user_version(conn: &Connection) -> CredoResult<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))
}

fn set_user_version(conn: &Connection, version: u32) -> CredoResult<()> {
    conn.pragma_update(None, "user_version", version)
        .map_err(|e| to_storage_err(e.to_string()))
}
