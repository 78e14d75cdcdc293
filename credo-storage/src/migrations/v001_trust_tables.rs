//! v001: peer identities, organisations, trust records, and both history logs.
//!
//! The CHECK constraints mirror the bounded-value newtypes: an out-of-range
//! value is rejected by the database even if it arrives through raw SQL.

use rusqlite::Connection;

use credo_core::errors::CredoResult;

use crate::to_storage_err;

/// Run the v001 migration: create the trust tables.
pub fn migrate(conn: &Connection) -> CredoResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS peers (
            peer_id   TEXT PRIMARY KEY,
            address   TEXT NOT NULL,
            connected INTEGER NOT NULL DEFAULT 1 CHECK (connected IN (0, 1))
        );

        CREATE INDEX IF NOT EXISTS idx_peers_connected ON peers(connected);

        CREATE TABLE IF NOT EXISTS peer_organisations (
            peer_id         TEXT NOT NULL,
            organisation_id TEXT NOT NULL,
            PRIMARY KEY (peer_id, organisation_id),
            FOREIGN KEY (peer_id) REFERENCES peers(peer_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_peer_org_org ON peer_organisations(organisation_id);

        CREATE TABLE IF NOT EXISTS trust_records (
            peer_id              TEXT PRIMARY KEY,
            fixed_trust          INTEGER NOT NULL CHECK (fixed_trust IN (0, 1)),
            service_trust        REAL NOT NULL CHECK (service_trust BETWEEN 0.0 AND 1.0),
            reputation           REAL NOT NULL CHECK (reputation BETWEEN 0.0 AND 1.0),
            recommendation_trust REAL NOT NULL CHECK (recommendation_trust BETWEEN 0.0 AND 1.0),
            competence_belief    REAL NOT NULL CHECK (competence_belief BETWEEN 0.0 AND 1.0),
            integrity_belief     REAL NOT NULL CHECK (integrity_belief BETWEEN 0.0 AND 1.0),
            initial_reputation_provided_by_count INTEGER NOT NULL
                CHECK (initial_reputation_provided_by_count >= 0),
            updated_at           TEXT NOT NULL,
            FOREIGN KEY (peer_id) REFERENCES peers(peer_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_trust_recommendation
            ON trust_records(recommendation_trust);
        CREATE INDEX IF NOT EXISTS idx_trust_service
            ON trust_records(service_trust);

        CREATE TABLE IF NOT EXISTS service_history (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            peer_id      TEXT NOT NULL,
            satisfaction REAL NOT NULL CHECK (satisfaction BETWEEN 0.0 AND 1.0),
            weight       REAL NOT NULL CHECK (weight BETWEEN 0.0 AND 1.0),
            recorded_at  TEXT NOT NULL,
            FOREIGN KEY (peer_id) REFERENCES peers(peer_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_service_history_peer ON service_history(peer_id);

        CREATE TABLE IF NOT EXISTS recommendation_history (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            peer_id      TEXT NOT NULL,
            satisfaction REAL NOT NULL CHECK (satisfaction BETWEEN 0.0 AND 1.0),
            weight       REAL NOT NULL CHECK (weight BETWEEN 0.0 AND 1.0),
            recorded_at  TEXT NOT NULL,
            FOREIGN KEY (peer_id) REFERENCES peers(peer_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_recommendation_history_peer
            ON recommendation_history(peer_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(())
}
