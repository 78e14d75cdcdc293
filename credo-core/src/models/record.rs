//! The per-peer trust record.

use serde::{Deserialize, Serialize};

use super::peer::PeerIdentity;
use super::trust::{HistoryRecord, TrustValue};

/// Local belief state about one peer, along several independent dimensions.
///
/// Owned by the trust store; protocols load a record, mutate the owned value
/// and store it back through the store interface. All five trust dimensions
/// are bounded `TrustValue`s, so a record cannot be constructed with an
/// out-of-range field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustRecord {
    /// The peer this record describes.
    pub peer: PeerIdentity,
    /// Operator override: automated updates must leave trust fields alone.
    pub fixed_trust: bool,
    /// Belief that the peer delivers good service (threat reports).
    pub service_trust: TrustValue,
    /// Network-derived standing of the peer.
    pub reputation: TrustValue,
    /// Belief that the peer's recommendations about third peers are accurate.
    pub recommendation_trust: TrustValue,
    /// Belief that the peer is competent at what it reports on.
    pub competence_belief: TrustValue,
    /// Belief that the peer reports consistently, without deception.
    pub integrity_belief: TrustValue,
    /// How many peers contributed to the bootstrap reputation estimate.
    pub initial_reputation_provided_by_count: u32,
    /// Direct-interaction outcomes, newest last.
    pub service_history: Vec<HistoryRecord>,
    /// Recommendation-accuracy outcomes, newest last.
    pub recommendation_history: Vec<HistoryRecord>,
    /// False once roster sync reports the peer gone; the record is retained
    /// but the peer is excluded from peer selection.
    pub connected: bool,
}

impl TrustRecord {
    /// Fresh record for a newly met peer, all dimensions seeded from one
    /// bootstrap reputation estimate.
    pub fn bootstrapped(
        peer: PeerIdentity,
        reputation: TrustValue,
        provided_by: u32,
    ) -> Self {
        Self {
            peer,
            fixed_trust: false,
            service_trust: reputation,
            reputation,
            recommendation_trust: reputation,
            competence_belief: TrustValue::NEUTRAL,
            integrity_belief: TrustValue::NEUTRAL,
            initial_reputation_provided_by_count: provided_by,
            service_history: Vec::new(),
            recommendation_history: Vec::new(),
            connected: true,
        }
    }

    /// Operator-seeded record whose trust fields are pinned.
    pub fn fixed(peer: PeerIdentity, reputation: TrustValue) -> Self {
        Self {
            fixed_trust: true,
            ..Self::bootstrapped(peer, reputation, 0)
        }
    }

    /// Append a service-history record, keeping at most `window` entries.
    pub fn push_service_history(&mut self, record: HistoryRecord, window: usize) {
        push_trimmed(&mut self.service_history, record, window);
    }

    /// Append a recommendation-history record, keeping at most `window` entries.
    pub fn push_recommendation_history(&mut self, record: HistoryRecord, window: usize) {
        push_trimmed(&mut self.recommendation_history, record, window);
    }
}

fn push_trimmed(history: &mut Vec<HistoryRecord>, record: HistoryRecord, window: usize) {
    history.push(record);
    if window > 0 && history.len() > window {
        let excess = history.len() - window;
        history.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peer::PeerIdentity;

    fn record() -> TrustRecord {
        TrustRecord::bootstrapped(
            PeerIdentity::new("peer-a", "10.0.0.1"),
            TrustValue::new(0.4).unwrap(),
            0,
        )
    }

    #[test]
    fn bootstrap_seeds_all_dimensions_from_reputation() {
        let r = record();
        assert_eq!(r.service_trust, r.reputation);
        assert_eq!(r.recommendation_trust, r.reputation);
        assert_eq!(r.competence_belief, TrustValue::NEUTRAL);
        assert!(!r.fixed_trust);
        assert!(r.connected);
    }

    #[test]
    fn history_window_keeps_newest() {
        let mut r = record();
        for i in 0..5 {
            let sat = TrustValue::new(f64::from(i) / 10.0).unwrap();
            r.push_service_history(HistoryRecord::now(sat, TrustValue::MAX), 3);
        }
        assert_eq!(r.service_history.len(), 3);
        // Oldest two (0.0, 0.1) were dropped.
        assert!((r.service_history[0].satisfaction.value() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn zero_window_disables_trimming() {
        let mut r = record();
        for _ in 0..10 {
            r.push_recommendation_history(
                HistoryRecord::now(TrustValue::NEUTRAL, TrustValue::MAX),
                0,
            );
        }
        assert_eq!(r.recommendation_history.len(), 10);
    }
}
