//! Opinion aggregation: N reports about one target into one consensus.
//!
//! Strategies are stateless per call; history accrues in trust records via
//! the protocols that call them. Aggregating zero opinions yields `None` —
//! "no data" is a distinct outcome from a zero-score verdict.

use std::sync::Arc;

use credo_core::errors::{CredoError, CredoResult};
use credo_core::models::intel::Opinion;
use credo_core::models::trust::{ScoreValue, TrustValue};

/// The combined outcome of one aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consensus {
    pub score: ScoreValue,
    pub confidence: TrustValue,
}

/// Combines opinions about one target into a single consensus.
pub trait AggregationStrategy: Send + Sync {
    /// Aggregate, returning `None` for an empty opinion set.
    fn aggregate(&self, opinions: &[Opinion]) -> Option<Consensus>;
}

/// Baseline: score is the confidence-weighted average, confidence the mean.
///
/// All-zero confidences fall back to the unweighted arithmetic mean (with
/// zero confidence) instead of dividing by zero.
pub struct ConfidenceWeighted;

impl AggregationStrategy for ConfidenceWeighted {
    fn aggregate(&self, opinions: &[Opinion]) -> Option<Consensus> {
        if opinions.is_empty() {
            return None;
        }

        let n = opinions.len() as f64;
        let total_confidence: f64 = opinions.iter().map(|o| o.confidence.value()).sum();

        let score = if total_confidence > 0.0 {
            let weighted: f64 = opinions
                .iter()
                .map(|o| o.score.value() * o.confidence.value())
                .sum();
            weighted / total_confidence
        } else {
            opinions.iter().map(|o| o.score.value()).sum::<f64>() / n
        };

        Some(Consensus {
            score: ScoreValue::saturating(score),
            confidence: TrustValue::saturating(total_confidence / n),
        })
    }
}

/// The single most confident opinion wins outright.
pub struct MaxConfidence;

impl AggregationStrategy for MaxConfidence {
    fn aggregate(&self, opinions: &[Opinion]) -> Option<Consensus> {
        let mut best: Option<&Opinion> = None;
        for opinion in opinions {
            match best {
                Some(current) if opinion.confidence <= current.confidence => {}
                _ => best = Some(opinion),
            }
        }
        best.map(|o| Consensus {
            score: o.score,
            confidence: o.confidence,
        })
    }
}

/// Resolve a strategy by its configuration name.
pub fn strategy_from_name(name: &str) -> CredoResult<Arc<dyn AggregationStrategy>> {
    match name {
        "confidence-weighted" => Ok(Arc::new(ConfidenceWeighted)),
        "max-confidence" => Ok(Arc::new(MaxConfidence)),
        other => Err(CredoError::Config {
            message: format!("unknown aggregation strategy: {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opinion(score: f64, confidence: f64) -> Opinion {
        Opinion::new(
            ScoreValue::new(score).unwrap(),
            TrustValue::new(confidence).unwrap(),
        )
    }

    #[test]
    fn weighted_average_matches_hand_computation() {
        let opinions = [opinion(0.8, 1.0), opinion(0.2, 0.5)];
        let consensus = ConfidenceWeighted.aggregate(&opinions).unwrap();

        // (0.8·1.0 + 0.2·0.5) / 1.5 = 0.6, confidence (1.0+0.5)/2 = 0.75.
        assert!((consensus.score.value() - 0.6).abs() < 1e-9);
        assert!((consensus.confidence.value() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn empty_set_yields_no_verdict() {
        assert!(ConfidenceWeighted.aggregate(&[]).is_none());
        assert!(MaxConfidence.aggregate(&[]).is_none());
    }

    #[test]
    fn zero_confidences_fall_back_to_plain_mean() {
        let opinions = [opinion(-0.4, 0.0), opinion(0.8, 0.0)];
        let consensus = ConfidenceWeighted.aggregate(&opinions).unwrap();
        assert!((consensus.score.value() - 0.2).abs() < 1e-9);
        assert_eq!(consensus.confidence.value(), 0.0);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let opinions = [opinion(-0.33, 0.21), opinion(0.57, 0.83), opinion(0.1, 0.4)];
        let a = ConfidenceWeighted.aggregate(&opinions).unwrap();
        let b = ConfidenceWeighted.aggregate(&opinions).unwrap();
        assert_eq!(a.score.value().to_bits(), b.score.value().to_bits());
        assert_eq!(a.confidence.value().to_bits(), b.confidence.value().to_bits());
    }

    #[test]
    fn max_confidence_picks_the_surest_reporter() {
        let opinions = [opinion(-0.9, 0.3), opinion(0.5, 0.8), opinion(-0.1, 0.8)];
        let consensus = MaxConfidence.aggregate(&opinions).unwrap();
        // Ties keep the earliest, so 0.5 at 0.8 wins over -0.1 at 0.8.
        assert!((consensus.score.value() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_strategy_name_is_a_config_error() {
        assert!(strategy_from_name("median").is_err());
        assert!(strategy_from_name("confidence-weighted").is_ok());
    }
}
