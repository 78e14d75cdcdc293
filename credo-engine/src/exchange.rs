//! Pending exchanges: timeout-bounded correlation of one outbound request to
//! its inbound responses.
//!
//! An exchange is consumed exactly once — at its deadline, when every
//! solicited peer has answered, or at shutdown drain. Resolution removes the
//! entry first, so late responses and duplicate deadline fires hit nothing.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use credo_core::models::intel::Opinion;
use credo_core::models::peer::PeerId;

/// Which protocol opened the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    Recommendation,
    Intelligence,
}

/// Why a recommendation exchange was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePurpose {
    /// Routine refresh of an existing record.
    Refresh,
    /// Supplementing a low-confidence bootstrap estimate.
    Bootstrap,
}

/// One outstanding request/response correlation.
#[derive(Debug)]
pub struct PendingExchange {
    pub id: Uuid,
    pub kind: ExchangeKind,
    /// Peer id (recommendations) or intelligence target.
    pub target: String,
    pub purpose: ExchangePurpose,
    /// Peers the request was addressed to.
    pub expected: HashSet<PeerId>,
    /// Responses received so far; duplicates replace.
    pub responses: HashMap<PeerId, Opinion>,
    pub deadline: Instant,
}

impl PendingExchange {
    pub fn new(
        kind: ExchangeKind,
        target: impl Into<String>,
        purpose: ExchangePurpose,
        expected: HashSet<PeerId>,
        deadline: Instant,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target: target.into(),
            purpose,
            expected,
            responses: HashMap::new(),
            deadline,
        }
    }

    /// Record one response. Unsolicited responders are ignored; a repeated
    /// response from the same peer replaces the previous one.
    fn record(&mut self, from: PeerId, opinion: Opinion) -> bool {
        if !self.expected.contains(&from) {
            debug!(exchange = %self.id, peer = %from, "ignoring unsolicited response");
            return false;
        }
        self.responses.insert(from, opinion);
        true
    }

    /// True once every solicited peer has answered.
    pub fn is_complete(&self) -> bool {
        self.responses.len() == self.expected.len()
    }

    /// Responses in deterministic (peer-id) order, for reproducible
    /// aggregation.
    pub fn ordered_responses(&self) -> Vec<(PeerId, Opinion)> {
        let mut pairs: Vec<_> = self
            .responses
            .iter()
            .map(|(peer, op)| (peer.clone(), *op))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

/// In-memory registry of all outstanding exchanges, keyed by kind and target.
#[derive(Default)]
pub struct ExchangeRegistry {
    exchanges: DashMap<(ExchangeKind, String), PendingExchange>,
}

impl ExchangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when an exchange is already outstanding for this kind/target.
    pub fn is_open(&self, kind: ExchangeKind, target: &str) -> bool {
        self.exchanges
            .contains_key(&(kind, target.to_string()))
    }

    /// Open a new exchange. An already-open exchange for the same target is
    /// kept; the new one is dropped and `false` returned.
    pub fn open(&self, exchange: PendingExchange) -> bool {
        let key = (exchange.kind, exchange.target.clone());
        match self.exchanges.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                debug!(
                    exchange = %exchange.id,
                    target = %exchange.target,
                    expected = exchange.expected.len(),
                    "exchange opened"
                );
                slot.insert(exchange);
                true
            }
        }
    }

    /// Record a response against the open exchange for `target`.
    ///
    /// Returns the exchange when this response completed it (the entry is
    /// removed); `None` while it stays open, and `None` for late or
    /// unsolicited responses.
    pub fn record_response(
        &self,
        kind: ExchangeKind,
        target: &str,
        from: PeerId,
        opinion: Opinion,
    ) -> Option<PendingExchange> {
        let key = (kind, target.to_string());
        let complete = {
            let mut entry = self.exchanges.get_mut(&key)?;
            if !entry.record(from, opinion) {
                return None;
            }
            entry.is_complete()
        };

        if complete {
            self.exchanges.remove(&key).map(|(_, ex)| ex)
        } else {
            None
        }
    }

    /// Remove and return every exchange whose deadline has passed.
    pub fn take_due(&self, now: Instant) -> Vec<PendingExchange> {
        let due: Vec<_> = self
            .exchanges
            .iter()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| entry.key().clone())
            .collect();

        due.iter()
            .filter_map(|key| self.exchanges.remove(key).map(|(_, ex)| ex))
            .collect()
    }

    /// Remove and return every outstanding exchange (shutdown drain).
    pub fn drain_all(&self) -> Vec<PendingExchange> {
        let keys: Vec<_> = self.exchanges.iter().map(|e| e.key().clone()).collect();
        keys.iter()
            .filter_map(|key| self.exchanges.remove(key).map(|(_, ex)| ex))
            .collect()
    }

    /// Earliest outstanding deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.exchanges.iter().map(|e| e.deadline).min()
    }

    /// Number of outstanding exchanges.
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credo_core::models::trust::{ScoreValue, TrustValue};
    use std::time::Duration;

    fn opinion(score: f64, confidence: f64) -> Opinion {
        Opinion::new(
            ScoreValue::new(score).unwrap(),
            TrustValue::new(confidence).unwrap(),
        )
    }

    fn exchange_with(expected: &[&str], deadline: Instant) -> PendingExchange {
        PendingExchange::new(
            ExchangeKind::Intelligence,
            "198.51.100.7",
            ExchangePurpose::Refresh,
            expected.iter().map(|p| PeerId::from(*p)).collect(),
            deadline,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_responses_replace() {
        let registry = ExchangeRegistry::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        registry.open(exchange_with(&["a", "b"], deadline));

        let kind = ExchangeKind::Intelligence;
        assert!(registry
            .record_response(kind, "198.51.100.7", PeerId::from("a"), opinion(0.2, 0.5))
            .is_none());
        assert!(registry
            .record_response(kind, "198.51.100.7", PeerId::from("a"), opinion(0.8, 0.9))
            .is_none());

        // Completing response from b; a's replacement (not both) survives.
        let done = registry
            .record_response(kind, "198.51.100.7", PeerId::from("b"), opinion(0.1, 0.1))
            .expect("complete");
        assert_eq!(done.responses.len(), 2);
        assert!((done.responses[&PeerId::from("a")].score.value() - 0.8).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn unsolicited_and_late_responses_are_ignored() {
        let registry = ExchangeRegistry::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        registry.open(exchange_with(&["a"], deadline));

        let kind = ExchangeKind::Intelligence;
        assert!(registry
            .record_response(kind, "198.51.100.7", PeerId::from("stranger"), opinion(0.0, 1.0))
            .is_none());

        // Deadline fires; the exchange is consumed.
        tokio::time::advance(Duration::from_secs(3)).await;
        let due = registry.take_due(Instant::now());
        assert_eq!(due.len(), 1);
        assert!(due[0].responses.is_empty());

        // Late response finds nothing.
        assert!(registry
            .record_response(kind, "198.51.100.7", PeerId::from("a"), opinion(0.5, 0.5))
            .is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn take_due_leaves_future_exchanges() {
        let registry = ExchangeRegistry::new();
        let now = Instant::now();
        registry.open(exchange_with(&["a"], now + Duration::from_secs(1)));

        let mut other = exchange_with(&["a"], now + Duration::from_secs(10));
        other.target = "203.0.113.9".to_string();
        registry.open(other);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(registry.take_due(Instant::now()).len(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.next_deadline().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reopening_an_open_exchange_is_rejected() {
        let registry = ExchangeRegistry::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        assert!(registry.open(exchange_with(&["a"], deadline)));
        assert!(!registry.open(exchange_with(&["b"], deadline)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_returns_partial_data() {
        let registry = ExchangeRegistry::new();
        let deadline = Instant::now() + Duration::from_secs(60);
        registry.open(exchange_with(&["a", "b"], deadline));
        registry.record_response(
            ExchangeKind::Intelligence,
            "198.51.100.7",
            PeerId::from("a"),
            opinion(0.3, 0.4),
        );

        let drained = registry.drain_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].responses.len(), 1);
        assert!(registry.is_empty());
    }
}
