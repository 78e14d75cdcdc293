//! `NetworkBridge` — the typed send surface the protocols use.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use credo_core::errors::{BusError, CredoError, CredoResult};
use credo_core::models::intel::ThreatVerdict;
use credo_core::models::peer::PeerId;
use credo_core::models::trust::{ScoreValue, TrustValue};

use crate::bus::MessageBus;
use crate::channel::Channel;
use crate::envelope::{Envelope, MessageKind};
use crate::messages::{
    AlertMessage, IntelligenceRequest, IntelligenceResponse, RecommendationRequest,
    RecommendationResponse,
};

/// Serializes typed payloads into envelopes and publishes them.
pub struct NetworkBridge {
    bus: Arc<dyn MessageBus>,
    local_peer: PeerId,
}

impl NetworkBridge {
    pub fn new(bus: Arc<dyn MessageBus>, local_peer: PeerId) -> Self {
        Self { bus, local_peer }
    }

    /// The id outbound envelopes are signed with.
    pub fn local_peer(&self) -> &PeerId {
        &self.local_peer
    }

    /// Ask the network for recommendations about `target`.
    pub fn broadcast_recommendation_request(&self, target: &PeerId) -> CredoResult<()> {
        self.broadcast(
            MessageKind::RecommendationRequest,
            &RecommendationRequest {
                target: target.clone(),
            },
        )
    }

    /// Answer a recommendation request with our own opinion.
    pub fn send_recommendation_response(
        &self,
        to: &PeerId,
        target: &PeerId,
        recommendation: TrustValue,
    ) -> CredoResult<()> {
        self.directed(
            MessageKind::RecommendationResponse,
            to,
            &RecommendationResponse {
                target: target.clone(),
                recommendation,
            },
        )
    }

    /// Broadcast a misbehavior alert.
    pub fn broadcast_alert(
        &self,
        target: &str,
        score: ScoreValue,
        confidence: TrustValue,
    ) -> CredoResult<()> {
        self.broadcast(
            MessageKind::Alert,
            &AlertMessage {
                target: target.to_string(),
                score,
                confidence,
            },
        )
    }

    /// Ask the network for intelligence about `target`.
    pub fn broadcast_intelligence_request(&self, target: &str) -> CredoResult<()> {
        self.broadcast(
            MessageKind::IntelligenceRequest,
            &IntelligenceRequest {
                target: target.to_string(),
            },
        )
    }

    /// Answer an intelligence request with a cached verdict.
    pub fn send_intelligence_response(
        &self,
        to: &PeerId,
        verdict: &ThreatVerdict,
    ) -> CredoResult<()> {
        self.directed(
            MessageKind::IntelligenceResponse,
            to,
            &IntelligenceResponse {
                target: verdict.target.clone(),
                score: verdict.score,
                confidence: verdict.confidence,
            },
        )
    }

    /// Push a final aggregated verdict to the host system.
    pub fn publish_verdict(&self, verdict: &ThreatVerdict) -> CredoResult<()> {
        let raw = serde_json::to_string(verdict).map_err(|e| {
            CredoError::Bus(BusError::Encode {
                reason: e.to_string(),
            })
        })?;
        self.bus.publish(Channel::EngineToHost, raw)?;
        debug!(target = %verdict.target, "verdict published to host");
        Ok(())
    }

    fn broadcast<T: Serialize>(&self, kind: MessageKind, payload: &T) -> CredoResult<()> {
        let envelope = Envelope::broadcast(kind, self.local_peer.clone(), to_value(payload)?);
        self.publish_envelope(envelope)
    }

    fn directed<T: Serialize>(&self, kind: MessageKind, to: &PeerId, payload: &T) -> CredoResult<()> {
        let envelope = Envelope::directed(
            kind,
            self.local_peer.clone(),
            to.clone(),
            to_value(payload)?,
        );
        self.publish_envelope(envelope)
    }

    fn publish_envelope(&self, envelope: Envelope) -> CredoResult<()> {
        let kind = envelope.kind.as_str();
        let raw = envelope.encode()?;
        let receivers = self.bus.publish(Channel::EngineToNetwork, raw)?;
        debug!(kind, receivers, "envelope published");
        Ok(())
    }
}

fn to_value<T: Serialize>(payload: &T) -> CredoResult<serde_json::Value> {
    serde_json::to_value(payload).map_err(|e| {
        CredoError::Bus(BusError::Encode {
            reason: e.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryBus;

    #[tokio::test]
    async fn outbound_envelopes_carry_the_local_sender() {
        let bus = InMemoryBus::shared();
        let mut rx = bus.subscribe(Channel::EngineToNetwork);
        let bridge = NetworkBridge::new(bus, PeerId::from("self"));

        bridge
            .broadcast_intelligence_request("198.51.100.7")
            .unwrap();

        let raw = rx.recv().await.unwrap();
        let envelope = Envelope::decode(&raw).unwrap();
        assert_eq!(envelope.kind, MessageKind::IntelligenceRequest);
        assert_eq!(envelope.sender, PeerId::from("self"));
        assert!(envelope.recipient.is_none());
    }

    #[tokio::test]
    async fn responses_are_directed() {
        let bus = InMemoryBus::shared();
        let mut rx = bus.subscribe(Channel::EngineToNetwork);
        let bridge = NetworkBridge::new(bus, PeerId::from("self"));

        bridge
            .send_recommendation_response(
                &PeerId::from("asker"),
                &PeerId::from("subject"),
                TrustValue::new(0.4).unwrap(),
            )
            .unwrap();

        let envelope = Envelope::decode(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(envelope.recipient, Some(PeerId::from("asker")));
    }

    #[tokio::test]
    async fn verdicts_go_to_the_host_channel() {
        let bus = InMemoryBus::shared();
        let mut host_rx = bus.subscribe(Channel::EngineToHost);
        let bridge = NetworkBridge::new(bus, PeerId::from("self"));

        let verdict = ThreatVerdict::new(
            "198.51.100.7",
            ScoreValue::new(-0.6).unwrap(),
            TrustValue::new(0.8).unwrap(),
        );
        bridge.publish_verdict(&verdict).unwrap();

        let raw = host_rx.recv().await.unwrap();
        let decoded: ThreatVerdict = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded, verdict);
    }
}
