//! Trust-record persistence.
//!
//! A record write is one transaction covering the peer row, its organisation
//! set, the trust fields, and both history logs — a partial write is a
//! consistency violation, so everything commits or nothing does.

use chrono::Utc;
use rusqlite::{params, Connection};

use credo_core::errors::CredoResult;
use credo_core::models::peer::PeerId;
use credo_core::models::record::TrustRecord;
use credo_core::models::trust::HistoryRecord;

use super::{peer_ops, timestamp_from_db, trust_from_db};
use crate::to_storage_err;

const SELECT_SERVICE_HISTORY: &str =
    "SELECT satisfaction, weight, recorded_at FROM service_history
     WHERE peer_id = ?1 ORDER BY id";

const SELECT_RECOMMENDATION_HISTORY: &str =
    "SELECT satisfaction, weight, recorded_at FROM recommendation_history
     WHERE peer_id = ?1 ORDER BY id";

/// Load one peer's full trust record, or `None` when the peer is unknown.
pub fn get_trust_record(conn: &Connection, peer: &PeerId) -> CredoResult<Option<TrustRecord>> {
    let row = conn
        .query_row(
            "SELECT t.fixed_trust, t.service_trust, t.reputation, t.recommendation_trust,
                    t.competence_belief, t.integrity_belief,
                    t.initial_reputation_provided_by_count, p.connected
             FROM trust_records t
             JOIN peers p ON p.peer_id = t.peer_id
             WHERE t.peer_id = ?1",
            params![peer.0],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(to_storage_err(other.to_string())),
        })?;

    let Some((fixed, st, rep, rt, cb, ib, provided_by, connected)) = row else {
        return Ok(None);
    };

    let Some(identity) = peer_ops::get_peer(conn, peer)? else {
        return Ok(None);
    };

    Ok(Some(TrustRecord {
        peer: identity,
        fixed_trust: fixed != 0,
        service_trust: trust_from_db(st)?,
        reputation: trust_from_db(rep)?,
        recommendation_trust: trust_from_db(rt)?,
        competence_belief: trust_from_db(cb)?,
        integrity_belief: trust_from_db(ib)?,
        initial_reputation_provided_by_count: provided_by.max(0) as u32,
        service_history: load_history(conn, SELECT_SERVICE_HISTORY, peer)?,
        recommendation_history: load_history(conn, SELECT_RECOMMENDATION_HISTORY, peer)?,
        connected: connected != 0,
    }))
}

/// Store a trust record atomically.
pub fn put_trust_record(conn: &Connection, record: &TrustRecord) -> CredoResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("put_trust_record begin: {e}")))?;

    match put_trust_record_inner(&tx, record) {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("put_trust_record commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

fn put_trust_record_inner(conn: &Connection, record: &TrustRecord) -> CredoResult<()> {
    peer_ops::upsert_peer(conn, &record.peer)?;
    peer_ops::set_connected(conn, &record.peer.id, record.connected)?;

    conn.execute(
        "INSERT INTO trust_records (
            peer_id, fixed_trust, service_trust, reputation, recommendation_trust,
            competence_belief, integrity_belief, initial_reputation_provided_by_count,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(peer_id) DO UPDATE SET
            fixed_trust = excluded.fixed_trust,
            service_trust = excluded.service_trust,
            reputation = excluded.reputation,
            recommendation_trust = excluded.recommendation_trust,
            competence_belief = excluded.competence_belief,
            integrity_belief = excluded.integrity_belief,
            initial_reputation_provided_by_count = excluded.initial_reputation_provided_by_count,
            updated_at = excluded.updated_at",
        params![
            record.peer.id.0,
            record.fixed_trust as i32,
            record.service_trust.value(),
            record.reputation.value(),
            record.recommendation_trust.value(),
            record.competence_belief.value(),
            record.integrity_belief.value(),
            record.initial_reputation_provided_by_count,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    replace_history(conn, "service_history", &record.peer.id, &record.service_history)?;
    replace_history(
        conn,
        "recommendation_history",
        &record.peer.id,
        &record.recommendation_history,
    )?;

    Ok(())
}

fn replace_history(
    conn: &Connection,
    table: &str,
    peer: &PeerId,
    history: &[HistoryRecord],
) -> CredoResult<()> {
    // `table` is one of two compile-time constants, never caller input.
    conn.execute(
        &format!("DELETE FROM {table} WHERE peer_id = ?1"),
        params![peer.0],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let sql = format!(
        "INSERT INTO {table} (peer_id, satisfaction, weight, recorded_at) VALUES (?1, ?2, ?3, ?4)"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    for entry in history {
        stmt.execute(params![
            peer.0,
            entry.satisfaction.value(),
            entry.weight.value(),
            entry.recorded_at.to_rfc3339(),
        ])
        .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(())
}

fn load_history(
    conn: &Connection,
    sql: &str,
    peer: &PeerId,
) -> CredoResult<Vec<HistoryRecord>> {
    let mut stmt = conn.prepare(sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![peer.0], |row| {
            Ok((
                row.get::<_, f64>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut history = Vec::with_capacity(rows.len());
    for (satisfaction, weight, recorded_at) in rows {
        history.push(HistoryRecord {
            satisfaction: trust_from_db(satisfaction)?,
            weight: trust_from_db(weight)?,
            recorded_at: timestamp_from_db(&recorded_at),
        });
    }
    Ok(history)
}
