//! Query modules: free functions over a borrowed connection.

pub mod peer_ops;
pub mod trust_ops;
pub mod verdict_ops;

use chrono::{DateTime, Utc};

use credo_core::errors::{CredoError, CredoResult, StorageError};
use credo_core::models::trust::{ScoreValue, TrustValue};

/// Rehydrate a bounded trust value from a database column.
///
/// The schema CHECK constraints make an out-of-range column unreachable
/// through this crate; hitting one means the file was modified externally,
/// which is reported as corruption rather than clamped away.
pub(crate) fn trust_from_db(value: f64) -> CredoResult<TrustValue> {
    TrustValue::new(value).map_err(|_| {
        CredoError::Storage(StorageError::ConstraintViolation {
            message: format!("trust column out of range: {value}"),
        })
    })
}

/// Rehydrate a bounded score value from a database column.
pub(crate) fn score_from_db(value: f64) -> CredoResult<ScoreValue> {
    ScoreValue::new(value).map_err(|_| {
        CredoError::Storage(StorageError::ConstraintViolation {
            message: format!("score column out of range: {value}"),
        })
    })
}

/// Parse an RFC 3339 column, falling back to now on legacy rows.
pub(crate) fn timestamp_from_db(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
