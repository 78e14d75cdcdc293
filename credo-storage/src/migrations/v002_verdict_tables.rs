//! v002: cached aggregated threat verdicts.
//!
//! `score` spans the signed range; the other columns stay in `[0,1]`.

use rusqlite::Connection;

use credo_core::errors::CredoResult;

use crate::to_storage_err;

/// Run the v002 migration: create the verdict cache.
pub fn migrate(conn: &Connection) -> CredoResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS threat_verdicts (
            target          TEXT PRIMARY KEY,
            score           REAL NOT NULL CHECK (score BETWEEN -1.0 AND 1.0),
            confidence      REAL NOT NULL CHECK (confidence BETWEEN 0.0 AND 1.0),
            confidentiality REAL CHECK (confidentiality BETWEEN 0.0 AND 1.0),
            updated_at      TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(())
}
