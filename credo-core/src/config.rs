//! Configuration for the trust engine.
//!
//! # Examples
//!
//! ```
//! use credo_core::config::TrustConfig;
//!
//! let config = TrustConfig::default();
//! assert!((config.recommendation_trust_threshold - 0.5).abs() < f64::EPSILON);
//! assert_eq!(config.collection_window_ms, 2_000);
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{CredoError, CredoResult};
use crate::models::peer::{OrgId, PeerId};

/// Engine-wide tunables, loaded from TOML with serde defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Id this engine instance signs outbound envelopes with. Default: "local".
    pub local_peer_id: String,
    /// Organisations the local peer belongs to. Default: empty.
    pub local_organisations: Vec<String>,
    /// Minimum recommendation trust a peer needs to be asked for
    /// recommendations. Default: 0.5.
    pub recommendation_trust_threshold: f64,
    /// Minimum service trust a peer needs to be asked for threat
    /// intelligence. Default: 0.5.
    pub service_trust_threshold: f64,
    /// Collection window for recommendation/intelligence exchanges, in
    /// milliseconds. Default: 2000.
    pub collection_window_ms: u64,
    /// Bootstrap reputation when nothing else is known. Default: 0.3.
    pub default_reputation: f64,
    /// Bootstrap estimates below this trigger a recommendation round.
    /// Default: 0.5.
    pub min_bootstrap_confidence: f64,
    /// Aggregation strategy: "confidence-weighted" or "max-confidence".
    /// Default: "confidence-weighted".
    pub aggregation_strategy: String,
    /// Interaction-evaluation strategy: "deviation-scaled" or "even".
    /// Default: "deviation-scaled".
    pub evaluation_strategy: String,
    /// How much an established reporter's deviation is forgiven, in [0,1].
    /// Default: 0.5.
    pub evaluation_leniency: f64,
    /// Fraction of trust removed by a full-confidence alert. Default: 0.5.
    pub alert_penalty: f64,
    /// History records kept per peer per log (0 = unbounded). Default: 100.
    pub history_window: usize,
    /// Base weight of recommendation-accuracy feedback records. Default: 0.7.
    pub recommendation_feedback_weight: f64,
    /// Peer ids seeded with fixed trust. Default: empty.
    pub pre_trusted_peers: Vec<String>,
    /// Organisations whose members are seeded with fixed trust. Default: empty.
    pub pre_trusted_organisations: Vec<String>,
    /// Reputation granted to pre-trusted peers. Default: 0.9.
    pub seed_reputation: f64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            local_peer_id: "local".to_string(),
            local_organisations: Vec::new(),
            recommendation_trust_threshold: 0.5,
            service_trust_threshold: 0.5,
            collection_window_ms: 2_000,
            default_reputation: 0.3,
            min_bootstrap_confidence: 0.5,
            aggregation_strategy: "confidence-weighted".to_string(),
            evaluation_strategy: "deviation-scaled".to_string(),
            evaluation_leniency: 0.5,
            alert_penalty: 0.5,
            history_window: 100,
            recommendation_feedback_weight: 0.7,
            pre_trusted_peers: Vec::new(),
            pre_trusted_organisations: Vec::new(),
            seed_reputation: 0.9,
        }
    }
}

impl TrustConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> CredoResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| CredoError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        toml::from_str(&raw).map_err(|e| CredoError::Config {
            message: format!("cannot parse {}: {e}", path.display()),
        })
    }

    /// The exchange collection window as a `Duration`.
    pub fn collection_window(&self) -> Duration {
        Duration::from_millis(self.collection_window_ms)
    }

    /// Local peer id as a typed id.
    pub fn local_peer(&self) -> PeerId {
        PeerId(self.local_peer_id.clone())
    }

    /// Local organisation memberships as typed ids.
    pub fn local_orgs(&self) -> BTreeSet<OrgId> {
        self.local_organisations
            .iter()
            .map(|o| OrgId(o.clone()))
            .collect()
    }

    /// True when the peer id or one of its organisations is operator-seeded.
    pub fn is_pre_trusted(&self, peer: &PeerId, orgs: &BTreeSet<OrgId>) -> bool {
        self.pre_trusted_peers.iter().any(|p| p == &peer.0)
            || orgs
                .iter()
                .any(|o| self.pre_trusted_organisations.iter().any(|p| p == &o.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn defaults_parse_from_empty_toml() {
        let config: TrustConfig = toml::from_str("").unwrap();
        assert_eq!(config.history_window, 100);
        assert_eq!(config.aggregation_strategy, "confidence-weighted");
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "collection_window_ms = 500\npre_trusted_peers = [\"seed-1\"]"
        )
        .unwrap();

        let config = TrustConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.collection_window(), Duration::from_millis(500));
        assert!(config.is_pre_trusted(&PeerId::from("seed-1"), &BTreeSet::new()));
        assert!((config.default_reputation - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn pre_trusted_organisation_marks_members() {
        let config = TrustConfig {
            pre_trusted_organisations: vec!["soc".to_string()],
            ..TrustConfig::default()
        };
        let orgs: BTreeSet<OrgId> = [OrgId::from("soc")].into_iter().collect();
        assert!(config.is_pre_trusted(&PeerId::from("anyone"), &orgs));
    }
}
