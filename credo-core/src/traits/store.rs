//! The narrow persistence interface the protocols operate through.

use std::collections::BTreeSet;

use crate::errors::CredoResult;
use crate::models::intel::ThreatVerdict;
use crate::models::peer::{OrgId, PeerId, PeerIdentity};
use crate::models::record::TrustRecord;

/// What changed when a roster update was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    /// Peers that were not connected before this update.
    pub added: Vec<PeerIdentity>,
    /// Peers that were connected before and are gone now.
    pub removed: Vec<PeerId>,
}

impl RosterDiff {
    /// True when the update changed nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Persistence of trust records and cached verdicts.
///
/// All mutations are serialized behind a single writer by the implementation;
/// a trust-field write and its history append are atomic as a unit. Methods
/// taking a threshold or organisation filter only ever return connected
/// peers.
pub trait TrustStore: Send + Sync {
    /// Load one peer's trust record, histories included.
    fn get_trust_record(&self, peer: &PeerId) -> CredoResult<Option<TrustRecord>>;

    /// Store a trust record atomically (fields plus both history logs).
    fn put_trust_record(&self, record: &TrustRecord) -> CredoResult<()>;

    /// Connected peers whose recommendation trust is at least `threshold`.
    fn list_peers_by_min_recommendation_trust(
        &self,
        threshold: f64,
    ) -> CredoResult<Vec<PeerIdentity>>;

    /// Connected peers whose service trust is at least `threshold`.
    fn list_peers_by_min_service_trust(&self, threshold: f64) -> CredoResult<Vec<PeerIdentity>>;

    /// Connected peers sharing at least one of the given organisations.
    fn get_peers_by_organisations(&self, orgs: &BTreeSet<OrgId>) -> CredoResult<Vec<PeerIdentity>>;

    /// All currently connected peers.
    fn connected_peers(&self) -> CredoResult<Vec<PeerIdentity>>;

    /// Reconcile the connected-peer set against a roster push.
    ///
    /// Newly seen peers are persisted and reported in `added`; peers missing
    /// from the roster keep their records but are marked disconnected and
    /// reported in `removed`. Re-applying an identical roster yields an
    /// empty diff.
    fn upsert_peer_roster(&self, peers: &[PeerIdentity]) -> CredoResult<RosterDiff>;

    /// Cached aggregated verdict for a target, if any.
    fn get_threat_verdict(&self, target: &str) -> CredoResult<Option<ThreatVerdict>>;

    /// Cache (insert or replace) an aggregated verdict.
    fn put_threat_verdict(&self, verdict: &ThreatVerdict) -> CredoResult<()>;
}
