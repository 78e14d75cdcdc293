//! Peer identity and roster queries.

use std::collections::BTreeSet;

use rusqlite::{params, Connection};

use credo_core::errors::CredoResult;
use credo_core::models::peer::{OrgId, PeerId, PeerIdentity};

use crate::to_storage_err;

/// Insert or refresh a peer identity, marking it connected and replacing its
/// organisation set.
pub fn upsert_peer(conn: &Connection, peer: &PeerIdentity) -> CredoResult<()> {
    conn.execute(
        "INSERT INTO peers (peer_id, address, connected) VALUES (?1, ?2, 1)
         ON CONFLICT(peer_id) DO UPDATE SET address = excluded.address, connected = 1",
        params![peer.id.0, peer.address],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    replace_organisations(conn, &peer.id, &peer.organisations)
}

/// Replace a peer's organisation memberships.
pub fn replace_organisations(
    conn: &Connection,
    peer: &PeerId,
    orgs: &BTreeSet<OrgId>,
) -> CredoResult<()> {
    conn.execute(
        "DELETE FROM peer_organisations WHERE peer_id = ?1",
        params![peer.0],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    for org in orgs {
        conn.execute(
            "INSERT OR IGNORE INTO peer_organisations (peer_id, organisation_id) VALUES (?1, ?2)",
            params![peer.0, org.0],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(())
}

/// Mark a peer connected or disconnected, keeping its record.
pub fn set_connected(conn: &Connection, peer: &PeerId, connected: bool) -> CredoResult<()> {
    conn.execute(
        "UPDATE peers SET connected = ?2 WHERE peer_id = ?1",
        params![peer.0, connected as i32],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Load one peer's identity, connected or not.
pub fn get_peer(conn: &Connection, peer: &PeerId) -> CredoResult<Option<PeerIdentity>> {
    let row = conn
        .query_row(
            "SELECT peer_id, address FROM peers WHERE peer_id = ?1",
            params![peer.0],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(to_storage_err(other.to_string())),
        })?;

    match row {
        Some((id, address)) => {
            let id = PeerId(id);
            let organisations = load_organisations(conn, &id)?;
            Ok(Some(PeerIdentity {
                id,
                address,
                organisations,
            }))
        }
        None => Ok(None),
    }
}

/// Ids of all currently connected peers.
pub fn connected_peer_ids(conn: &Connection) -> CredoResult<BTreeSet<PeerId>> {
    let mut stmt = conn
        .prepare("SELECT peer_id FROM peers WHERE connected = 1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(ids.into_iter().map(PeerId).collect())
}

/// Identities of all currently connected peers.
pub fn connected_peers(conn: &Connection) -> CredoResult<Vec<PeerIdentity>> {
    collect_peers(
        conn,
        "SELECT peer_id, address FROM peers WHERE connected = 1 ORDER BY peer_id",
        params![],
    )
}

/// Connected peers belonging to at least one of the given organisations.
pub fn peers_by_organisations(
    conn: &Connection,
    orgs: &BTreeSet<OrgId>,
) -> CredoResult<Vec<PeerIdentity>> {
    if orgs.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = std::iter::repeat("?")
        .take(orgs.len())
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT DISTINCT p.peer_id, p.address
         FROM peers p
         JOIN peer_organisations po ON po.peer_id = p.peer_id
         WHERE p.connected = 1 AND po.organisation_id IN ({placeholders})
         ORDER BY p.peer_id"
    );
    let org_params: Vec<&str> = orgs.iter().map(|o| o.0.as_str()).collect();
    collect_peers(conn, &sql, rusqlite::params_from_iter(org_params))
}

/// Connected peers whose recommendation trust is at least `threshold`.
pub fn peers_by_min_recommendation_trust(
    conn: &Connection,
    threshold: f64,
) -> CredoResult<Vec<PeerIdentity>> {
    collect_peers(
        conn,
        "SELECT p.peer_id, p.address
         FROM peers p
         JOIN trust_records t ON t.peer_id = p.peer_id
         WHERE p.connected = 1 AND t.recommendation_trust >= ?1
         ORDER BY p.peer_id",
        params![threshold],
    )
}

/// Connected peers whose service trust is at least `threshold`.
pub fn peers_by_min_service_trust(
    conn: &Connection,
    threshold: f64,
) -> CredoResult<Vec<PeerIdentity>> {
    collect_peers(
        conn,
        "SELECT p.peer_id, p.address
         FROM peers p
         JOIN trust_records t ON t.peer_id = p.peer_id
         WHERE p.connected = 1 AND t.service_trust >= ?1
         ORDER BY p.peer_id",
        params![threshold],
    )
}

/// Organisation memberships of one peer.
pub fn load_organisations(conn: &Connection, peer: &PeerId) -> CredoResult<BTreeSet<OrgId>> {
    let mut stmt = conn
        .prepare("SELECT organisation_id FROM peer_organisations WHERE peer_id = ?1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let orgs = stmt
        .query_map(params![peer.0], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(orgs.into_iter().map(OrgId).collect())
}

fn collect_peers<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> CredoResult<Vec<PeerIdentity>> {
    let mut stmt = conn.prepare(sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut peers = Vec::with_capacity(rows.len());
    for (id, address) in rows {
        let id = PeerId(id);
        let organisations = load_organisations(conn, &id)?;
        peers.push(PeerIdentity {
            id,
            address,
            organisations,
        });
    }
    Ok(peers)
}
