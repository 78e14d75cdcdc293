//! Bounded value types and history records.
//!
//! `TrustValue` and `ScoreValue` are the enforcement points for the bounded
//! trust invariant: constructors reject out-of-range input instead of
//! clamping, so a buggy computation surfaces as an error rather than a
//! silently saturated write.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{SCORE_MAX, SCORE_MIN};
use crate::errors::ProtocolError;

/// Trust-dimension value in the closed range `[0.0, 1.0]`.
///
/// # Examples
///
/// ```
/// use credo_core::models::trust::TrustValue;
///
/// let v = TrustValue::new(0.7).unwrap();
/// assert!((v.value() - 0.7).abs() < f64::EPSILON);
/// assert!(TrustValue::new(1.2).is_err());
/// assert!(TrustValue::new(f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct TrustValue(f64);

impl TrustValue {
    /// Neutral belief — no evidence either way.
    pub const NEUTRAL: TrustValue = TrustValue(0.5);
    /// Full trust.
    pub const MAX: TrustValue = TrustValue(1.0);
    /// No trust.
    pub const MIN: TrustValue = TrustValue(0.0);

    /// Create a new `TrustValue`, rejecting values outside `[0.0, 1.0]`.
    pub fn new(value: f64) -> Result<Self, ProtocolError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ProtocolError::ValueOutOfRange {
                what: "trust value",
                value,
            });
        }
        Ok(Self(value))
    }

    /// Create a `TrustValue` from arithmetic whose operands were already
    /// validated, clamping rounding drift back into range. Non-finite input
    /// still collapses to the nearest bound.
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Raw f64 value.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for TrustValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl TryFrom<f64> for TrustValue {
    type Error = ProtocolError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TrustValue> for f64 {
    fn from(v: TrustValue) -> Self {
        v.0
    }
}

/// Threat verdict score in the closed range `[-1.0, 1.0]`.
///
/// Negative is malicious, positive is benign. The signed range is canonical
/// across the engine; see DESIGN.md for the range decision.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ScoreValue(f64);

impl ScoreValue {
    /// Create a new `ScoreValue`, rejecting values outside `[-1.0, 1.0]`.
    pub fn new(value: f64) -> Result<Self, ProtocolError> {
        if !value.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&value) {
            return Err(ProtocolError::ValueOutOfRange {
                what: "threat score",
                value,
            });
        }
        Ok(Self(value))
    }

    /// Clamping constructor for already-validated arithmetic.
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(SCORE_MIN, SCORE_MAX))
    }

    /// Raw f64 value.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.3}", self.0)
    }
}

impl TryFrom<f64> for ScoreValue {
    type Error = ProtocolError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScoreValue> for f64 {
    fn from(v: ScoreValue) -> Self {
        v.0
    }
}

/// One direct-interaction or recommendation-accuracy outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// How satisfied we were with the outcome.
    pub satisfaction: TrustValue,
    /// How much this outcome should count.
    pub weight: TrustValue,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Record an outcome happening now.
    pub fn now(satisfaction: TrustValue, weight: TrustValue) -> Self {
        Self {
            satisfaction,
            weight,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trust_value_accepts_bounds() {
        assert!(TrustValue::new(0.0).is_ok());
        assert!(TrustValue::new(1.0).is_ok());
    }

    #[test]
    fn trust_value_rejects_out_of_range() {
        assert!(TrustValue::new(-0.001).is_err());
        assert!(TrustValue::new(1.001).is_err());
        assert!(TrustValue::new(f64::INFINITY).is_err());
    }

    #[test]
    fn score_value_spans_signed_range() {
        assert!(ScoreValue::new(-1.0).is_ok());
        assert!(ScoreValue::new(1.0).is_ok());
        assert!(ScoreValue::new(-1.5).is_err());
    }

    #[test]
    fn saturating_collapses_nan_to_floor() {
        assert_eq!(TrustValue::saturating(f64::NAN).value(), 0.0);
        assert_eq!(ScoreValue::saturating(f64::NAN).value(), 0.0);
    }

    proptest! {
        #[test]
        fn trust_value_never_escapes_bounds(raw in -10.0f64..10.0) {
            match TrustValue::new(raw) {
                Ok(v) => prop_assert!((0.0..=1.0).contains(&v.value())),
                Err(_) => prop_assert!(!(0.0..=1.0).contains(&raw)),
            }
        }

        #[test]
        fn saturating_always_in_bounds(raw in proptest::num::f64::ANY) {
            let v = TrustValue::saturating(raw);
            prop_assert!((0.0..=1.0).contains(&v.value()));
        }
    }
}
