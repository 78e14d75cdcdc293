//! Typed payloads carried inside envelopes.
//!
//! Bounded values deserialize through their validating constructors, so an
//! out-of-range score or confidence is rejected at the wire boundary, before
//! any protocol code runs.

use serde::{Deserialize, Serialize};

use credo_core::models::peer::{PeerId, PeerIdentity};
use credo_core::models::trust::{ScoreValue, TrustValue};

/// Roster push from the network layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerListUpdate {
    pub peers: Vec<PeerIdentity>,
}

/// Ask peers for their recommendation trust in `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub target: PeerId,
}

/// One peer's recommendation opinion about `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub target: PeerId,
    pub recommendation: TrustValue,
}

/// Misbehavior alert about a target entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub target: String,
    pub score: ScoreValue,
    pub confidence: TrustValue,
}

/// Ask peers for their intelligence about a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceRequest {
    pub target: String,
}

/// One peer's threat report about a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceResponse {
    pub target: String,
    pub score: ScoreValue,
    pub confidence: TrustValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_confidence_fails_to_decode() {
        let raw = r#"{"target":"198.51.100.7","score":-0.5,"confidence":1.7}"#;
        assert!(serde_json::from_str::<AlertMessage>(raw).is_err());
    }

    #[test]
    fn signed_scores_decode() {
        let raw = r#"{"target":"198.51.100.7","score":-0.5,"confidence":0.7}"#;
        let alert: AlertMessage = serde_json::from_str(raw).unwrap();
        assert!((alert.score.value() + 0.5).abs() < 1e-9);
    }
}
