/// Credo system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lower bound of the threat score range (maximally malicious).
pub const SCORE_MIN: f64 = -1.0;

/// Upper bound of the threat score range (maximally benign).
pub const SCORE_MAX: f64 = 1.0;

/// Upper bound on peers solicited in a single exchange.
pub const MAX_EXCHANGE_FANOUT: usize = 64;
