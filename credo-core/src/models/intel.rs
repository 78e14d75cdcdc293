//! Threat-intelligence verdicts and peer opinions.

use serde::{Deserialize, Serialize};

use super::trust::{ScoreValue, TrustValue};

/// One peer's assessment of a target: score plus confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    /// Signed severity; negative is malicious.
    pub score: ScoreValue,
    /// How sure the reporter is.
    pub confidence: TrustValue,
}

impl Opinion {
    pub fn new(score: ScoreValue, confidence: TrustValue) -> Self {
        Self { score, confidence }
    }
}

/// An aggregated, cacheable verdict about a target.
///
/// Derived from zero or more peer opinions plus optionally a local
/// observation; reporter identities are consumed only transiently for trust
/// updates and are not stored with the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatVerdict {
    /// The assessed entity (IP, domain, …).
    pub target: String,
    /// Consensus score.
    pub score: ScoreValue,
    /// Consensus confidence.
    pub confidence: TrustValue,
    /// Minimum service trust a requester needs before we share this verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidentiality: Option<TrustValue>,
}

impl ThreatVerdict {
    pub fn new(target: impl Into<String>, score: ScoreValue, confidence: TrustValue) -> Self {
        Self {
            target: target.into(),
            score,
            confidence,
            confidentiality: None,
        }
    }

    /// The verdict as an opinion, for feeding back into aggregation.
    pub fn as_opinion(&self) -> Opinion {
        Opinion::new(self.score, self.confidence)
    }

    /// True when a requester with the given service trust may see this
    /// verdict.
    pub fn visible_to(&self, requester_service_trust: TrustValue) -> bool {
        match self.confidentiality {
            Some(level) => requester_service_trust >= level,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidentiality_gates_visibility() {
        let mut v = ThreatVerdict::new(
            "198.51.100.7",
            ScoreValue::new(-0.8).unwrap(),
            TrustValue::new(0.9).unwrap(),
        );
        assert!(v.visible_to(TrustValue::MIN));

        v.confidentiality = Some(TrustValue::new(0.8).unwrap());
        assert!(v.visible_to(TrustValue::new(0.9).unwrap()));
        assert!(!v.visible_to(TrustValue::new(0.3).unwrap()));
    }
}
