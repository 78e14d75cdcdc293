//! Recommendation protocol: solicit third-party trust opinions about a peer
//! and fold them into its record.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, instrument};

use credo_core::config::TrustConfig;
use credo_core::constants::MAX_EXCHANGE_FANOUT;
use credo_core::errors::CredoResult;
use credo_core::models::intel::Opinion;
use credo_core::models::peer::PeerId;
use credo_core::models::trust::{HistoryRecord, ScoreValue, TrustValue};
use credo_core::traits::store::TrustStore;

use credo_bus::messages::{RecommendationRequest, RecommendationResponse};
use credo_bus::NetworkBridge;

use crate::aggregate::AggregationStrategy;
use crate::beliefs;
use crate::exchange::{ExchangeKind, ExchangePurpose, ExchangeRegistry, PendingExchange};
use crate::protocols::decode_payload;

/// Requests and aggregates recommendation-trust opinions.
pub struct RecommendationProtocol {
    store: Arc<dyn TrustStore>,
    bridge: Arc<NetworkBridge>,
    exchanges: Arc<ExchangeRegistry>,
    aggregation: Arc<dyn AggregationStrategy>,
    config: TrustConfig,
}

impl RecommendationProtocol {
    pub fn new(
        store: Arc<dyn TrustStore>,
        bridge: Arc<NetworkBridge>,
        exchanges: Arc<ExchangeRegistry>,
        aggregation: Arc<dyn AggregationStrategy>,
        config: TrustConfig,
    ) -> Self {
        Self {
            store,
            bridge,
            exchanges,
            aggregation,
            config,
        }
    }

    /// Refresh the recommendation trust of `target` from the network.
    #[instrument(skip(self))]
    pub fn request_recommendations(&self, target: &PeerId) -> CredoResult<()> {
        self.open_exchange(target, ExchangePurpose::Refresh)
    }

    /// Supplement a low-confidence bootstrap estimate for `target`.
    #[instrument(skip(self))]
    pub fn request_for_bootstrap(&self, target: &PeerId) -> CredoResult<()> {
        self.open_exchange(target, ExchangePurpose::Bootstrap)
    }

    fn open_exchange(&self, target: &PeerId, purpose: ExchangePurpose) -> CredoResult<()> {
        if self.exchanges.is_open(ExchangeKind::Recommendation, &target.0) {
            debug!(target = %target, "recommendation exchange already open");
            return Ok(());
        }

        let recommenders: HashSet<PeerId> = self
            .store
            .list_peers_by_min_recommendation_trust(self.config.recommendation_trust_threshold)?
            .into_iter()
            .map(|p| p.id)
            .filter(|id| id != target && id != self.bridge.local_peer())
            .take(MAX_EXCHANGE_FANOUT)
            .collect();

        if recommenders.is_empty() {
            debug!(target = %target, "no eligible recommenders");
            return Ok(());
        }

        let opened = self.exchanges.open(PendingExchange::new(
            ExchangeKind::Recommendation,
            target.0.clone(),
            purpose,
            recommenders,
            Instant::now() + self.config.collection_window(),
        ));
        if opened {
            self.bridge.broadcast_recommendation_request(target)?;
        }
        Ok(())
    }

    /// Answer another peer's recommendation request with our own opinion.
    ///
    /// Silence for unknown targets is a valid outcome, not an error.
    pub fn handle_recommendation_request(
        &self,
        from: PeerId,
        payload: serde_json::Value,
    ) -> CredoResult<()> {
        let Some(request) = decode_payload::<RecommendationRequest>("recommendation_request", payload)
        else {
            return Ok(());
        };

        match self.store.get_trust_record(&request.target)? {
            Some(record) => self.bridge.send_recommendation_response(
                &from,
                &request.target,
                record.recommendation_trust,
            ),
            None => {
                debug!(target = %request.target, "no local opinion, staying silent");
                Ok(())
            }
        }
    }

    /// Record a solicited opinion against the open exchange.
    pub fn handle_recommendation_response(
        &self,
        from: PeerId,
        payload: serde_json::Value,
    ) -> CredoResult<()> {
        let Some(response) =
            decode_payload::<RecommendationResponse>("recommendation_response", payload)
        else {
            return Ok(());
        };

        // The responder's own credibility becomes the opinion weight.
        let Some(responder) = self.store.get_trust_record(&from)? else {
            debug!(peer = %from, "response from unknown peer ignored");
            return Ok(());
        };

        let opinion = Opinion::new(
            ScoreValue::saturating(response.recommendation.value()),
            responder.recommendation_trust,
        );

        if let Some(complete) = self.exchanges.record_response(
            ExchangeKind::Recommendation,
            &response.target.0,
            from,
            opinion,
        ) {
            self.resolve(complete)?;
        }
        Ok(())
    }

    /// Fold a finished exchange into the target's record and feed accuracy
    /// back to each responder.
    #[instrument(skip(self, exchange), fields(target = %exchange.target))]
    pub fn resolve(&self, exchange: PendingExchange) -> CredoResult<()> {
        let responses = exchange.ordered_responses();
        let opinions: Vec<Opinion> = responses.iter().map(|(_, op)| *op).collect();

        let Some(consensus) = self.aggregation.aggregate(&opinions) else {
            debug!("recommendation exchange expired with no responses");
            return Ok(());
        };

        // Recommendation opinions live on [0,1]; the consensus score is a
        // weighted average of them, so it stays there.
        let value = TrustValue::saturating(consensus.score.value());
        let target = PeerId(exchange.target.clone());

        if let Some(mut record) = self.store.get_trust_record(&target)? {
            if record.fixed_trust {
                debug!(target = %target, "target is operator-fixed, skipping write");
            } else {
                record.recommendation_trust = value;
                if exchange.purpose == ExchangePurpose::Bootstrap {
                    record.reputation = value;
                    record.service_trust = value;
                    record.initial_reputation_provided_by_count = responses.len() as u32;
                }
                self.store.put_trust_record(&record)?;
            }
        }

        self.record_accuracy_feedback(&target, &responses, value)?;

        debug!(
            target = %target,
            responders = responses.len(),
            value = %value,
            "recommendation exchange resolved"
        );
        Ok(())
    }

    /// Append a recommendation-accuracy outcome for each responder: full
    /// satisfaction at the aggregate, shrinking with distance from it.
    fn record_accuracy_feedback(
        &self,
        target: &PeerId,
        responses: &[(PeerId, Opinion)],
        aggregate: TrustValue,
    ) -> CredoResult<()> {
        let weight = TrustValue::saturating(self.config.recommendation_feedback_weight);

        for (responder, opinion) in responses {
            if responder == target {
                continue;
            }
            let Some(mut record) = self.store.get_trust_record(responder)? else {
                continue;
            };
            if record.fixed_trust {
                continue;
            }

            let satisfaction =
                TrustValue::saturating(1.0 - (opinion.score.value() - aggregate.value()).abs());
            record.push_recommendation_history(
                HistoryRecord::now(satisfaction, weight),
                self.config.history_window,
            );
            beliefs::refresh_recommendation_trust(&mut record, self.config.history_window);
            self.store.put_trust_record(&record)?;
        }
        Ok(())
    }
}
