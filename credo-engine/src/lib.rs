//! # credo-engine
//!
//! The protocol suite of the trust engine: bootstrapping trust for unknown
//! peers, soliciting and aggregating recommendations, reconciling the peer
//! roster, combining threat reports into confidence-weighted verdicts while
//! feeding reporter credibility back, and applying misbehavior alerts.
//!
//! `TrustEngine` wires the protocols to the message bus and drives the
//! cooperative control loop.

pub mod aggregate;
pub mod beliefs;
pub mod engine;
pub mod evaluation;
pub mod exchange;
pub mod protocols;

pub use aggregate::{AggregationStrategy, Consensus};
pub use engine::{HostEvent, TrustEngine};
pub use evaluation::EvaluationStrategy;
pub use exchange::{ExchangeKind, ExchangeRegistry, PendingExchange};
