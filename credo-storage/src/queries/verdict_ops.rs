//! Threat-verdict cache queries.

use chrono::Utc;
use rusqlite::{params, Connection};

use credo_core::errors::CredoResult;
use credo_core::models::intel::ThreatVerdict;

use super::{score_from_db, trust_from_db};
use crate::to_storage_err;

/// Load the cached verdict for a target, if any.
pub fn get_verdict(conn: &Connection, target: &str) -> CredoResult<Option<ThreatVerdict>> {
    let row = conn
        .query_row(
            "SELECT score, confidence, confidentiality
             FROM threat_verdicts WHERE target = ?1",
            params![target],
            |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(to_storage_err(other.to_string())),
        })?;

    match row {
        Some((score, confidence, confidentiality)) => Ok(Some(ThreatVerdict {
            target: target.to_string(),
            score: score_from_db(score)?,
            confidence: trust_from_db(confidence)?,
            confidentiality: confidentiality.map(trust_from_db).transpose()?,
        })),
        None => Ok(None),
    }
}

/// Insert or replace the cached verdict for a target.
pub fn upsert_verdict(conn: &Connection, verdict: &ThreatVerdict) -> CredoResult<()> {
    conn.execute(
        "INSERT INTO threat_verdicts (target, score, confidence, confidentiality, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(target) DO UPDATE SET
            score = excluded.score,
            confidence = excluded.confidence,
            confidentiality = excluded.confidentiality,
            updated_at = excluded.updated_at",
        params![
            verdict.target,
            verdict.score.value(),
            verdict.confidence.value(),
            verdict.confidentiality.map(|c| c.value()),
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
