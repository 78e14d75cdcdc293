//! Belief recomputation from interaction history.
//!
//! Competence is the weighted mean of recorded satisfaction; integrity is a
//! consistency measure (how little satisfaction scatters around its mean).
//! Service trust blends the history-derived estimate with reputation, with
//! the blend shifting toward direct evidence as history accumulates. The
//! exact curves are an open-question decision recorded in DESIGN.md.

use credo_core::models::record::TrustRecord;
use credo_core::models::trust::{HistoryRecord, TrustValue};

/// Weighted mean satisfaction over a history log.
///
/// All-zero weights fall back to the unweighted mean; `None` for an empty
/// log.
pub fn competence_from_history(history: &[HistoryRecord]) -> Option<TrustValue> {
    weighted_mean(history).map(TrustValue::saturating)
}

/// Consistency of a history log: `1 − 2 · weighted mean |satisfaction − mean|`.
///
/// A peer that always earns the same satisfaction scores 1.0 regardless of
/// how high that satisfaction is; an erratic peer trends toward 0.
pub fn integrity_from_history(history: &[HistoryRecord]) -> Option<TrustValue> {
    let mean = weighted_mean(history)?;
    let scatter = weighted_scatter(history, mean);
    Some(TrustValue::saturating(1.0 - 2.0 * scatter))
}

/// How much direct history should outweigh reputation, in `[0,1]`.
///
/// With a bounded window the blend reaches 1.0 once the window is full;
/// an unbounded window approaches it asymptotically.
pub fn maturity(len: usize, window: usize) -> f64 {
    if window == 0 {
        len as f64 / (len as f64 + 1.0)
    } else {
        (len as f64 / window as f64).min(1.0)
    }
}

/// Recompute `competence_belief`, `integrity_belief` and `service_trust`
/// from the service history.
///
/// Must be called after appending to the history; records with an empty
/// history are left untouched.
pub fn apply_service_evaluation(record: &mut TrustRecord, window: usize) {
    let Some(competence) = competence_from_history(&record.service_history) else {
        return;
    };
    let integrity = integrity_from_history(&record.service_history)
        .unwrap_or(TrustValue::NEUTRAL);

    // Direct evidence: competence damped by inconsistency.
    let direct = competence.value() * (1.0 + integrity.value()) / 2.0;
    let m = maturity(record.service_history.len(), window);

    record.competence_belief = competence;
    record.integrity_belief = integrity;
    record.service_trust =
        TrustValue::saturating(m * direct + (1.0 - m) * record.reputation.value());
}

/// Recompute `recommendation_trust` from the recommendation history,
/// blended with the prior value.
pub fn refresh_recommendation_trust(record: &mut TrustRecord, window: usize) {
    let Some(mean) = weighted_mean(&record.recommendation_history) else {
        return;
    };
    let m = maturity(record.recommendation_history.len(), window);
    record.recommendation_trust =
        TrustValue::saturating(m * mean + (1.0 - m) * record.recommendation_trust.value());
}

fn weighted_mean(history: &[HistoryRecord]) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let total_weight: f64 = history.iter().map(|h| h.weight.value()).sum();
    if total_weight > 0.0 {
        let weighted: f64 = history
            .iter()
            .map(|h| h.satisfaction.value() * h.weight.value())
            .sum();
        Some(weighted / total_weight)
    } else {
        let sum: f64 = history.iter().map(|h| h.satisfaction.value()).sum();
        Some(sum / history.len() as f64)
    }
}

fn weighted_scatter(history: &[HistoryRecord], mean: f64) -> f64 {
    let total_weight: f64 = history.iter().map(|h| h.weight.value()).sum();
    if total_weight > 0.0 {
        history
            .iter()
            .map(|h| (h.satisfaction.value() - mean).abs() * h.weight.value())
            .sum::<f64>()
            / total_weight
    } else {
        history
            .iter()
            .map(|h| (h.satisfaction.value() - mean).abs())
            .sum::<f64>()
            / history.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credo_core::models::peer::PeerIdentity;

    fn tv(v: f64) -> TrustValue {
        TrustValue::new(v).unwrap()
    }

    fn entry(satisfaction: f64, weight: f64) -> HistoryRecord {
        HistoryRecord::now(tv(satisfaction), tv(weight))
    }

    fn record_with_reputation(reputation: f64) -> TrustRecord {
        TrustRecord::bootstrapped(
            PeerIdentity::new("peer-a", "192.0.2.1"),
            tv(reputation),
            0,
        )
    }

    #[test]
    fn competence_is_weight_sensitive() {
        // (1.0·1.0 + 0.0·0.25) / 1.25 = 0.8
        let history = [entry(1.0, 1.0), entry(0.0, 0.25)];
        let cb = competence_from_history(&history).unwrap();
        assert!((cb.value() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn consistent_history_scores_full_integrity() {
        let history = [entry(0.6, 1.0), entry(0.6, 1.0), entry(0.6, 0.5)];
        let ib = integrity_from_history(&history).unwrap();
        assert!((ib.value() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn erratic_history_scores_low_integrity() {
        let history = [entry(1.0, 1.0), entry(0.0, 1.0)];
        // mean 0.5, scatter 0.5 ⇒ integrity 0.
        let ib = integrity_from_history(&history).unwrap();
        assert!(ib.value() < 1e-9);
    }

    #[test]
    fn service_trust_leans_on_reputation_while_history_is_thin() {
        let mut record = record_with_reputation(0.9);
        record.push_service_history(entry(0.0, 1.0), 10);
        apply_service_evaluation(&mut record, 10);

        // One bad interaction in a window of ten barely dents a 0.9
        // reputation: 0.1·0.0 + 0.9·0.9 = 0.81.
        assert!((record.service_trust.value() - 0.81).abs() < 1e-9);
    }

    #[test]
    fn full_history_drowns_out_reputation() {
        let mut record = record_with_reputation(0.9);
        for _ in 0..10 {
            record.push_service_history(entry(0.0, 1.0), 10);
        }
        apply_service_evaluation(&mut record, 10);
        assert!(record.service_trust.value() < 1e-9);
        assert!(record.competence_belief.value() < 1e-9);
    }

    #[test]
    fn empty_history_changes_nothing() {
        let mut record = record_with_reputation(0.4);
        let before = record.clone();
        apply_service_evaluation(&mut record, 10);
        refresh_recommendation_trust(&mut record, 10);
        assert_eq!(record, before);
    }

    #[test]
    fn recommendation_trust_moves_toward_observed_accuracy() {
        let mut record = record_with_reputation(0.5);
        record.push_recommendation_history(entry(1.0, 1.0), 10);
        let before = record.recommendation_trust.value();
        refresh_recommendation_trust(&mut record, 10);
        assert!(record.recommendation_trust.value() > before);
    }
}
