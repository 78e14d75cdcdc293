//! The protocol suite.
//!
//! ## Modules
//!
//! - [`bootstrap`] — initial trust for peers with no local history
//! - [`recommendation`] — solicit and aggregate third-party opinions
//! - [`roster`] — reconcile the known peer set against roster pushes
//! - [`intelligence`] — request, collect and aggregate threat reports
//! - [`alert`] — validate and apply misbehavior alerts

pub mod alert;
pub mod bootstrap;
pub mod intelligence;
pub mod recommendation;
pub mod roster;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::warn;

use credo_core::models::intel::ThreatVerdict;

pub use alert::AlertProtocol;
pub use bootstrap::InitialTrustProtocol;
pub use intelligence::IntelligenceProtocol;
pub use recommendation::RecommendationProtocol;
pub use roster::RosterProtocol;

/// Receives every final aggregated verdict.
pub type VerdictSink = Arc<dyn Fn(&ThreatVerdict) + Send + Sync>;

/// Decode a payload, logging and swallowing malformed input.
///
/// A bad payload is dropped the same way a bad envelope is — it must never
/// take down the listen loop.
pub(crate) fn decode_payload<T: DeserializeOwned>(
    kind: &'static str,
    payload: serde_json::Value,
) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(kind, error = %e, "dropping malformed payload");
            None
        }
    }
}
