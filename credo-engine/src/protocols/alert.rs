//! Alert protocol: validate misbehavior alerts, penalize trust, propagate.

use std::sync::Arc;

use tracing::{debug, instrument};

use credo_core::config::TrustConfig;
use credo_core::errors::CredoResult;
use credo_core::models::intel::ThreatVerdict;
use credo_core::models::peer::PeerId;
use credo_core::models::trust::{ScoreValue, TrustValue};
use credo_core::traits::store::TrustStore;

use credo_bus::messages::AlertMessage;
use credo_bus::NetworkBridge;

use crate::protocols::{decode_payload, VerdictSink};

/// Applies and propagates misbehavior alerts.
pub struct AlertProtocol {
    store: Arc<dyn TrustStore>,
    bridge: Arc<NetworkBridge>,
    verdict_sink: VerdictSink,
    config: TrustConfig,
}

impl AlertProtocol {
    pub fn new(
        store: Arc<dyn TrustStore>,
        bridge: Arc<NetworkBridge>,
        verdict_sink: VerdictSink,
        config: TrustConfig,
    ) -> Self {
        Self {
            store,
            bridge,
            verdict_sink,
            config,
        }
    }

    /// Raise an alert originating from the local host system.
    ///
    /// Bounds are validated up front; an out-of-range confidence or score
    /// rejects the whole operation before any trust mutation.
    #[instrument(skip(self))]
    pub fn dispatch_alert(&self, target: &str, confidence: f64, score: f64) -> CredoResult<()> {
        let confidence = TrustValue::new(confidence)?;
        let score = ScoreValue::new(score)?;

        self.apply_penalty(target, confidence)?;
        self.store
            .put_threat_verdict(&ThreatVerdict::new(target, score, confidence))?;
        self.bridge.broadcast_alert(target, score, confidence)?;

        debug!(target, "local alert dispatched");
        Ok(())
    }

    /// Apply another peer's alert.
    ///
    /// The applied confidence is scaled by the sender's own service trust,
    /// so a distrusted peer moves us less. Corroboration-driven integrity
    /// reward for the sender is left to the intelligence protocol's
    /// interaction evaluation; remote alerts are not re-broadcast.
    pub fn handle_alert(&self, from: PeerId, payload: serde_json::Value) -> CredoResult<()> {
        let Some(alert) = decode_payload::<AlertMessage>("alert", payload) else {
            return Ok(());
        };

        let sender_trust = self
            .store
            .get_trust_record(&from)?
            .map(|r| r.service_trust)
            .unwrap_or(TrustValue::saturating(self.config.default_reputation));

        let applied =
            TrustValue::saturating(alert.confidence.value() * sender_trust.value());

        self.apply_penalty(&alert.target, applied)?;
        let verdict = ThreatVerdict::new(&alert.target, alert.score, applied);
        self.store.put_threat_verdict(&verdict)?;
        (self.verdict_sink)(&verdict);

        debug!(
            target = %alert.target,
            sender = %from,
            applied_confidence = %applied,
            "remote alert applied"
        );
        Ok(())
    }

    /// Lower the target peer's reputation and service trust in proportion to
    /// the alert confidence. Unknown or operator-fixed targets are left
    /// untouched.
    fn apply_penalty(&self, target: &str, confidence: TrustValue) -> CredoResult<()> {
        let target_id = PeerId::from(target);
        let Some(mut record) = self.store.get_trust_record(&target_id)? else {
            return Ok(());
        };
        if record.fixed_trust {
            debug!(target, "alert target is operator-fixed, skipping penalty");
            return Ok(());
        }

        let factor = 1.0 - self.config.alert_penalty * confidence.value();
        record.reputation = TrustValue::saturating(record.reputation.value() * factor);
        record.service_trust = TrustValue::saturating(record.service_trust.value() * factor);
        self.store.put_trust_record(&record)
    }
}
