//! Threat intelligence protocol: cache lookup, network solicitation,
//! interaction evaluation, aggregation, and delivery.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use credo_core::config::TrustConfig;
use credo_core::constants::MAX_EXCHANGE_FANOUT;
use credo_core::errors::CredoResult;
use credo_core::models::intel::{Opinion, ThreatVerdict};
use credo_core::models::peer::PeerId;
use credo_core::models::trust::{HistoryRecord, TrustValue};
use credo_core::traits::store::TrustStore;

use credo_bus::messages::{IntelligenceRequest, IntelligenceResponse};
use credo_bus::NetworkBridge;

use crate::aggregate::AggregationStrategy;
use crate::beliefs;
use crate::evaluation::EvaluationStrategy;
use crate::exchange::{ExchangeKind, ExchangePurpose, ExchangeRegistry, PendingExchange};
use crate::protocols::{decode_payload, VerdictSink};

/// Orchestrates one intelligence cycle per target.
pub struct IntelligenceProtocol {
    store: Arc<dyn TrustStore>,
    bridge: Arc<NetworkBridge>,
    exchanges: Arc<ExchangeRegistry>,
    aggregation: Arc<dyn AggregationStrategy>,
    evaluation: Arc<dyn EvaluationStrategy>,
    verdict_sink: VerdictSink,
    config: TrustConfig,
}

impl IntelligenceProtocol {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn TrustStore>,
        bridge: Arc<NetworkBridge>,
        exchanges: Arc<ExchangeRegistry>,
        aggregation: Arc<dyn AggregationStrategy>,
        evaluation: Arc<dyn EvaluationStrategy>,
        verdict_sink: VerdictSink,
        config: TrustConfig,
    ) -> Self {
        Self {
            store,
            bridge,
            exchanges,
            aggregation,
            evaluation,
            verdict_sink,
            config,
        }
    }

    /// Answer from cache or open a collection round for `target`.
    #[instrument(skip(self))]
    pub fn request_intelligence(&self, target: &str) -> CredoResult<()> {
        if let Some(cached) = self.store.get_threat_verdict(target)? {
            debug!(target, "serving cached verdict");
            (self.verdict_sink)(&cached);
            return Ok(());
        }

        if self.exchanges.is_open(ExchangeKind::Intelligence, target) {
            debug!(target, "intelligence exchange already open");
            return Ok(());
        }

        let reporters: HashSet<PeerId> = self
            .store
            .list_peers_by_min_service_trust(self.config.service_trust_threshold)?
            .into_iter()
            .map(|p| p.id)
            .filter(|id| id != self.bridge.local_peer())
            .take(MAX_EXCHANGE_FANOUT)
            .collect();

        if reporters.is_empty() {
            debug!(target, "no eligible reporters, no data");
            return Ok(());
        }

        let opened = self.exchanges.open(PendingExchange::new(
            ExchangeKind::Intelligence,
            target,
            ExchangePurpose::Refresh,
            reporters,
            Instant::now() + self.config.collection_window(),
        ));
        if opened {
            self.bridge.broadcast_intelligence_request(target)?;
        }
        Ok(())
    }

    /// Serve a peer's request from cache, respecting confidentiality.
    ///
    /// No cached verdict, or one the requester may not see, means silence.
    pub fn handle_intelligence_request(
        &self,
        from: PeerId,
        payload: serde_json::Value,
    ) -> CredoResult<()> {
        let Some(request) = decode_payload::<IntelligenceRequest>("intelligence_request", payload)
        else {
            return Ok(());
        };

        let Some(verdict) = self.store.get_threat_verdict(&request.target)? else {
            return Ok(());
        };

        let requester_trust = self
            .store
            .get_trust_record(&from)?
            .map(|r| r.service_trust)
            .unwrap_or(TrustValue::MIN);

        if verdict.visible_to(requester_trust) {
            self.bridge.send_intelligence_response(&from, &verdict)
        } else {
            debug!(
                target = %request.target,
                peer = %from,
                "verdict withheld, requester below confidentiality level"
            );
            Ok(())
        }
    }

    /// Record a solicited report against the open exchange.
    pub fn handle_intelligence_response(
        &self,
        from: PeerId,
        payload: serde_json::Value,
    ) -> CredoResult<()> {
        let Some(response) =
            decode_payload::<IntelligenceResponse>("intelligence_response", payload)
        else {
            return Ok(());
        };

        let opinion = Opinion::new(response.score, response.confidence);
        if let Some(complete) = self.exchanges.record_response(
            ExchangeKind::Intelligence,
            &response.target,
            from,
            opinion,
        ) {
            self.resolve(complete)?;
        }
        Ok(())
    }

    /// Close a collection round: evaluate reporters, aggregate, cache,
    /// deliver.
    #[instrument(skip(self, exchange), fields(target = %exchange.target))]
    pub fn resolve(&self, exchange: PendingExchange) -> CredoResult<()> {
        let responses = exchange.ordered_responses();

        // A stale cached verdict still counts as a local observation.
        let local = self.store.get_threat_verdict(&exchange.target)?;
        let mut opinions: Vec<Opinion> = responses.iter().map(|(_, op)| *op).collect();
        if let Some(prior) = &local {
            opinions.push(prior.as_opinion());
        }

        let Some(consensus) = self.aggregation.aggregate(&opinions) else {
            debug!("intelligence exchange expired with no data");
            return Ok(());
        };

        self.evaluate_reporters(&responses, &consensus);

        let verdict = ThreatVerdict::new(&exchange.target, consensus.score, consensus.confidence);
        self.store.put_threat_verdict(&verdict)?;
        (self.verdict_sink)(&verdict);

        debug!(
            reporters = responses.len(),
            score = %verdict.score,
            confidence = %verdict.confidence,
            "verdict aggregated"
        );
        Ok(())
    }

    /// Adjust each reporter's beliefs by how well its report matched the
    /// consensus.
    ///
    /// A failed write for one reporter is logged and skipped so it cannot
    /// poison the updates of the others or the verdict itself.
    fn evaluate_reporters(&self, responses: &[(PeerId, Opinion)], consensus: &crate::aggregate::Consensus) {
        for (reporter, report) in responses {
            if let Err(e) = self.evaluate_one(reporter, report, consensus) {
                warn!(peer = %reporter, error = %e, "reporter evaluation failed");
            }
        }
    }

    fn evaluate_one(
        &self,
        reporter: &PeerId,
        report: &Opinion,
        consensus: &crate::aggregate::Consensus,
    ) -> CredoResult<()> {
        let Some(mut record) = self.store.get_trust_record(reporter)? else {
            return Ok(());
        };
        if record.fixed_trust {
            return Ok(());
        }

        let satisfaction = self
            .evaluation
            .satisfaction(report, consensus, record.service_trust);
        let weight =
            TrustValue::saturating(report.confidence.value() * consensus.confidence.value());

        record.push_service_history(
            HistoryRecord::now(satisfaction, weight),
            self.config.history_window,
        );
        beliefs::apply_service_evaluation(&mut record, self.config.history_window);
        self.store.put_trust_record(&record)
    }
}
