//! Interaction evaluation: how satisfied we are with one reporter's
//! contribution, given the eventual consensus.
//!
//! The update curve is deliberately pluggable; only direction and
//! proportionality are contractual. Reports close to consensus raise
//! satisfaction, outliers lower it, and established reporters are given
//! benefit of the doubt before being penalized.

use std::sync::Arc;

use credo_core::errors::{CredoError, CredoResult};
use credo_core::models::intel::Opinion;
use credo_core::models::trust::TrustValue;

use crate::aggregate::Consensus;

/// Scores one reporter's contribution against the consensus.
pub trait EvaluationStrategy: Send + Sync {
    /// Satisfaction with `report`, given the consensus and the reporter's
    /// prior service trust.
    fn satisfaction(
        &self,
        report: &Opinion,
        consensus: &Consensus,
        prior_service_trust: TrustValue,
    ) -> TrustValue;
}

/// Default: satisfaction falls with distance from consensus, softened by the
/// reporter's standing.
///
/// `deviation = |score − consensus| / 2` normalizes the signed score range
/// to `[0,1]`; `leniency · prior_service_trust` is the fraction of that
/// deviation an established reporter is forgiven.
pub struct DeviationScaled {
    leniency: f64,
}

impl DeviationScaled {
    pub fn new(leniency: f64) -> Self {
        Self {
            leniency: leniency.clamp(0.0, 1.0),
        }
    }
}

impl EvaluationStrategy for DeviationScaled {
    fn satisfaction(
        &self,
        report: &Opinion,
        consensus: &Consensus,
        prior_service_trust: TrustValue,
    ) -> TrustValue {
        let deviation = (report.score.value() - consensus.score.value()).abs() / 2.0;
        let forgiven = deviation * (1.0 - self.leniency * prior_service_trust.value());
        TrustValue::saturating(1.0 - forgiven)
    }
}

/// Every reporter is credited in full; deviation is ignored.
///
/// Useful when the network is small and a harsh outlier penalty would
/// punish the only honest dissenter.
pub struct Even;

impl EvaluationStrategy for Even {
    fn satisfaction(
        &self,
        _report: &Opinion,
        _consensus: &Consensus,
        _prior_service_trust: TrustValue,
    ) -> TrustValue {
        TrustValue::MAX
    }
}

/// Resolve a strategy by its configuration name.
pub fn evaluation_from_name(name: &str, leniency: f64) -> CredoResult<Arc<dyn EvaluationStrategy>> {
    match name {
        "deviation-scaled" => Ok(Arc::new(DeviationScaled::new(leniency))),
        "even" => Ok(Arc::new(Even)),
        other => Err(CredoError::Config {
            message: format!("unknown evaluation strategy: {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credo_core::models::trust::ScoreValue;

    fn opinion(score: f64, confidence: f64) -> Opinion {
        Opinion::new(
            ScoreValue::new(score).unwrap(),
            TrustValue::new(confidence).unwrap(),
        )
    }

    fn consensus(score: f64, confidence: f64) -> Consensus {
        Consensus {
            score: ScoreValue::new(score).unwrap(),
            confidence: TrustValue::new(confidence).unwrap(),
        }
    }

    #[test]
    fn agreement_yields_full_satisfaction() {
        let strategy = DeviationScaled::new(0.5);
        let sat = strategy.satisfaction(
            &opinion(-0.6, 0.9),
            &consensus(-0.6, 0.8),
            TrustValue::NEUTRAL,
        );
        assert!((sat.value() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn outliers_lose_proportionally_to_deviation() {
        let strategy = DeviationScaled::new(0.0);
        let near = strategy.satisfaction(
            &opinion(-0.4, 0.9),
            &consensus(-0.6, 0.8),
            TrustValue::MIN,
        );
        let far = strategy.satisfaction(
            &opinion(0.8, 0.9),
            &consensus(-0.6, 0.8),
            TrustValue::MIN,
        );
        assert!(near > far);
        // |0.8 − (−0.6)| / 2 = 0.7 ⇒ satisfaction 0.3 with no leniency.
        assert!((far.value() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn established_reporters_are_forgiven_more() {
        let strategy = DeviationScaled::new(0.5);
        let report = opinion(0.8, 0.9);
        let agg = consensus(-0.6, 0.8);

        let newcomer = strategy.satisfaction(&report, &agg, TrustValue::MIN);
        let veteran = strategy.satisfaction(&report, &agg, TrustValue::new(0.9).unwrap());
        assert!(veteran > newcomer);
    }

    #[test]
    fn even_strategy_ignores_deviation() {
        let sat = Even.satisfaction(&opinion(0.9, 0.9), &consensus(-0.9, 0.9), TrustValue::MIN);
        assert_eq!(sat, TrustValue::MAX);
    }

    #[test]
    fn unknown_evaluation_name_is_a_config_error() {
        assert!(evaluation_from_name("harsh", 0.5).is_err());
        assert!(evaluation_from_name("even", 0.5).is_ok());
    }
}
