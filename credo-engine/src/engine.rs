//! `TrustEngine` — wires the protocols to the bus and drives the control
//! loop.
//!
//! One cooperative task multiplexes the network listener, the host event
//! queue, and the exchange timer; no handler blocks, so inbound peer
//! messages keep flowing while host events are processed. All record
//! mutations funnel through the store's single writer.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use credo_core::config::TrustConfig;
use credo_core::errors::CredoResult;
use credo_core::traits::store::TrustStore;

use credo_bus::{Channel, DispatchTable, MessageBus, MessageKind, NetworkBridge};

use crate::aggregate::strategy_from_name;
use crate::evaluation::evaluation_from_name;
use crate::exchange::{ExchangeKind, ExchangeRegistry, PendingExchange};
use crate::protocols::{
    AlertProtocol, InitialTrustProtocol, IntelligenceProtocol, RecommendationProtocol,
    RosterProtocol, VerdictSink,
};

/// Events pushed by the host system on the host channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// The host detected misbehavior locally.
    Alert {
        target: String,
        confidence: f64,
        score: f64,
    },
    /// The host wants a network verdict about a target.
    IntelligenceRequest { target: String },
}

impl HostEvent {
    /// Parse a raw host message; malformed input yields `None` and is
    /// skipped, not treated as an error.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// The assembled engine.
pub struct TrustEngine {
    bus: Arc<dyn MessageBus>,
    dispatch: DispatchTable,
    exchanges: Arc<ExchangeRegistry>,
    recommendations: Arc<RecommendationProtocol>,
    intelligence: Arc<IntelligenceProtocol>,
    alerts: Arc<AlertProtocol>,
    roster: Arc<RosterProtocol>,
    shutdown: watch::Sender<bool>,
}

impl TrustEngine {
    /// Wire the protocol set once. Strategy names come from configuration;
    /// an unknown name fails construction rather than first use.
    ///
    /// Without an explicit sink, verdicts are published on the
    /// engine-to-host channel.
    pub fn new(
        store: Arc<dyn TrustStore>,
        bus: Arc<dyn MessageBus>,
        config: TrustConfig,
        verdict_sink: Option<VerdictSink>,
    ) -> CredoResult<Arc<Self>> {
        let bridge = Arc::new(NetworkBridge::new(bus.clone(), config.local_peer()));
        let aggregation = strategy_from_name(&config.aggregation_strategy)?;
        let evaluation =
            evaluation_from_name(&config.evaluation_strategy, config.evaluation_leniency)?;
        let exchanges = Arc::new(ExchangeRegistry::new());

        let sink: VerdictSink = verdict_sink.unwrap_or_else(|| {
            let bridge = bridge.clone();
            Arc::new(move |verdict| {
                if let Err(e) = bridge.publish_verdict(verdict) {
                    warn!(target = %verdict.target, error = %e, "verdict delivery failed");
                }
            })
        });

        let recommendations = Arc::new(RecommendationProtocol::new(
            store.clone(),
            bridge.clone(),
            exchanges.clone(),
            aggregation.clone(),
            config.clone(),
        ));
        let bootstrap = Arc::new(InitialTrustProtocol::new(
            store.clone(),
            recommendations.clone(),
            config.clone(),
        ));
        let roster = Arc::new(RosterProtocol::new(store.clone(), bootstrap));
        let intelligence = Arc::new(IntelligenceProtocol::new(
            store.clone(),
            bridge.clone(),
            exchanges.clone(),
            aggregation,
            evaluation,
            sink.clone(),
            config.clone(),
        ));
        let alerts = Arc::new(AlertProtocol::new(store, bridge, sink, config));

        let dispatch = {
            let roster = roster.clone();
            let rec_req = recommendations.clone();
            let rec_resp = recommendations.clone();
            let intel_req = intelligence.clone();
            let intel_resp = intelligence.clone();
            let alert = alerts.clone();
            DispatchTable::new()
                .with_handler(MessageKind::PeerListUpdate, move |from, payload| {
                    roster.handle_peer_list_update(from, payload)
                })
                .with_handler(MessageKind::RecommendationRequest, move |from, payload| {
                    rec_req.handle_recommendation_request(from, payload)
                })
                .with_handler(MessageKind::RecommendationResponse, move |from, payload| {
                    rec_resp.handle_recommendation_response(from, payload)
                })
                .with_handler(MessageKind::IntelligenceRequest, move |from, payload| {
                    intel_req.handle_intelligence_request(from, payload)
                })
                .with_handler(MessageKind::IntelligenceResponse, move |from, payload| {
                    intel_resp.handle_intelligence_response(from, payload)
                })
                .with_handler(MessageKind::Alert, move |from, payload| {
                    alert.handle_alert(from, payload)
                })
                .with_unknown_hook(|envelope| {
                    debug!(kind = envelope.kind.as_str(), "unknown message kind dropped");
                })
        };

        let (shutdown, _) = watch::channel(false);
        Ok(Arc::new(Self {
            bus,
            dispatch,
            exchanges,
            recommendations,
            intelligence,
            alerts,
            roster,
            shutdown,
        }))
    }

    /// The recommendation protocol handle.
    pub fn recommendations(&self) -> &Arc<RecommendationProtocol> {
        &self.recommendations
    }

    /// The intelligence protocol handle.
    pub fn intelligence(&self) -> &Arc<IntelligenceProtocol> {
        &self.intelligence
    }

    /// The alert protocol handle.
    pub fn alerts(&self) -> &Arc<AlertProtocol> {
        &self.alerts
    }

    /// The roster protocol handle.
    pub fn roster(&self) -> &Arc<RosterProtocol> {
        &self.roster
    }

    /// Number of exchanges still waiting on responses or their deadline.
    pub fn pending_exchanges(&self) -> usize {
        self.exchanges.len()
    }

    /// Apply one host event. Malformed events are skipped silently.
    pub fn handle_host_event(&self, raw: &str) -> CredoResult<()> {
        match HostEvent::parse(raw) {
            Some(HostEvent::Alert {
                target,
                confidence,
                score,
            }) => self.alerts.dispatch_alert(&target, confidence, score),
            Some(HostEvent::IntelligenceRequest { target }) => {
                self.intelligence.request_intelligence(&target)
            }
            None => {
                debug!("skipping malformed host event");
                Ok(())
            }
        }
    }

    /// Drive the engine until shutdown.
    ///
    /// In-flight exchanges are drained with partial data on the way out, so
    /// shutdown never hangs on a silent network.
    #[instrument(skip(self))]
    pub async fn run(self: Arc<Self>) -> CredoResult<()> {
        let mut network_rx = self.bus.subscribe(Channel::NetworkToEngine);
        let mut host_rx = self.bus.subscribe(Channel::HostToEngine);
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut host_open = true;

        info!("trust engine running");
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                message = network_rx.recv() => match message {
                    Some(raw) => self.dispatch.dispatch(&raw),
                    None => break,
                },
                message = host_rx.recv(), if host_open => match message {
                    Some(raw) => {
                        if let Err(e) = self.handle_host_event(&raw) {
                            warn!(error = %e, "host event rejected");
                        }
                    }
                    None => host_open = false,
                },
                _ = deadline_tick(self.exchanges.next_deadline()) => self.resolve_due(),
            }
        }

        for exchange in self.exchanges.drain_all() {
            debug!(target = %exchange.target, "resolving exchange at shutdown");
            self.resolve_exchange(exchange);
        }
        info!("trust engine stopped");
        Ok(())
    }

    /// Signal the control loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    fn resolve_due(&self) {
        for exchange in self.exchanges.take_due(Instant::now()) {
            self.resolve_exchange(exchange);
        }
    }

    fn resolve_exchange(&self, exchange: PendingExchange) {
        let result = match exchange.kind {
            ExchangeKind::Recommendation => self.recommendations.resolve(exchange),
            ExchangeKind::Intelligence => self.intelligence.resolve(exchange),
        };
        if let Err(e) = result {
            warn!(error = %e, "exchange resolution failed");
        }
    }
}

/// Sleep until the earliest deadline; park forever when none is pending.
async fn deadline_tick(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
