//! The wire envelope: `{type, sender, payload}` plus an optional recipient.

use serde::{Deserialize, Serialize};

use credo_core::errors::{BusError, CredoError, CredoResult};
use credo_core::models::peer::PeerId;

/// Message kinds carried on the peer channels.
///
/// Unrecognized kinds survive decoding as `Unknown` so the dispatch layer
/// can hand them to the unknown-message hook instead of failing the listen
/// loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    PeerListUpdate,
    RecommendationRequest,
    RecommendationResponse,
    Alert,
    IntelligenceRequest,
    IntelligenceResponse,
    Unknown(String),
}

impl MessageKind {
    /// Wire tag of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::PeerListUpdate => "peer_list_update",
            MessageKind::RecommendationRequest => "recommendation_request",
            MessageKind::RecommendationResponse => "recommendation_response",
            MessageKind::Alert => "alert",
            MessageKind::IntelligenceRequest => "intelligence_request",
            MessageKind::IntelligenceResponse => "intelligence_response",
            MessageKind::Unknown(tag) => tag,
        }
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "peer_list_update" => MessageKind::PeerListUpdate,
            "recommendation_request" => MessageKind::RecommendationRequest,
            "recommendation_response" => MessageKind::RecommendationResponse,
            "alert" => MessageKind::Alert,
            "intelligence_request" => MessageKind::IntelligenceRequest,
            "intelligence_response" => MessageKind::IntelligenceResponse,
            _ => MessageKind::Unknown(tag),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        kind.as_str().to_string()
    }
}

/// The universal peer-channel envelope.
///
/// The adapter never looks inside `payload`; decoding it is the receiving
/// handler's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind tag.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Id of the sending peer.
    pub sender: PeerId,
    /// Opaque payload.
    pub payload: serde_json::Value,
    /// Optional addressee for directed replies; broadcast when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<PeerId>,
}

impl Envelope {
    /// Build a broadcast envelope.
    pub fn broadcast(kind: MessageKind, sender: PeerId, payload: serde_json::Value) -> Self {
        Self {
            kind,
            sender,
            payload,
            recipient: None,
        }
    }

    /// Build a directed envelope.
    pub fn directed(
        kind: MessageKind,
        sender: PeerId,
        recipient: PeerId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            sender,
            payload,
            recipient: Some(recipient),
        }
    }

    /// Serialize to the wire format.
    pub fn encode(&self) -> CredoResult<String> {
        serde_json::to_string(self).map_err(|e| {
            CredoError::Bus(BusError::Encode {
                reason: e.to_string(),
            })
        })
    }

    /// Deserialize from the wire format.
    pub fn decode(raw: &str) -> CredoResult<Self> {
        serde_json::from_str(raw).map_err(|e| {
            CredoError::Bus(BusError::Decode {
                reason: e.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips() {
        let env = Envelope::broadcast(
            MessageKind::Alert,
            PeerId::from("peer-a"),
            serde_json::json!({"target": "198.51.100.7"}),
        );
        let decoded = Envelope::decode(&env.encode().unwrap()).unwrap();
        assert_eq!(decoded, env);
    }

    #[test]
    fn unrecognized_kind_decodes_as_unknown() {
        let raw = r#"{"type":"gossip_v2","sender":"peer-a","payload":null}"#;
        let env = Envelope::decode(raw).unwrap();
        assert_eq!(env.kind, MessageKind::Unknown("gossip_v2".to_string()));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(Envelope::decode("{not json").is_err());
    }

    #[test]
    fn recipient_is_omitted_for_broadcasts() {
        let env = Envelope::broadcast(
            MessageKind::IntelligenceRequest,
            PeerId::from("peer-a"),
            serde_json::Value::Null,
        );
        assert!(!env.encode().unwrap().contains("recipient"));
    }
}
