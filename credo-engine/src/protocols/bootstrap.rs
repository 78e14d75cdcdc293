//! Initial trust: seed a record for a peer with no local history.

use std::sync::Arc;

use tracing::{debug, instrument};

use credo_core::config::TrustConfig;
use credo_core::errors::CredoResult;
use credo_core::models::peer::PeerIdentity;
use credo_core::models::record::TrustRecord;
use credo_core::models::trust::TrustValue;
use credo_core::traits::store::TrustStore;

use crate::protocols::recommendation::RecommendationProtocol;

/// Computes a bootstrap trust value for newly met peers.
pub struct InitialTrustProtocol {
    store: Arc<dyn TrustStore>,
    recommendations: Arc<RecommendationProtocol>,
    config: TrustConfig,
}

impl InitialTrustProtocol {
    pub fn new(
        store: Arc<dyn TrustStore>,
        recommendations: Arc<RecommendationProtocol>,
        config: TrustConfig,
    ) -> Self {
        Self {
            store,
            recommendations,
            config,
        }
    }

    /// Seed (or return) the trust record for `peer`.
    ///
    /// Shared-organisation affinity drives the estimate: the reputation of
    /// same-organisation peers, weighted by how much we trust their
    /// recommendations. Without any affinity the configured default applies,
    /// and a low-confidence estimate triggers a recommendation round to
    /// supplement it.
    #[instrument(skip(self, peer), fields(peer = %peer.id))]
    pub fn bootstrap(&self, peer: &PeerIdentity) -> CredoResult<TrustRecord> {
        if let Some(existing) = self.store.get_trust_record(&peer.id)? {
            debug!("peer already known, bootstrap is a no-op");
            return Ok(existing);
        }

        if self.config.is_pre_trusted(&peer.id, &peer.organisations) {
            let record = TrustRecord::fixed(
                peer.clone(),
                TrustValue::new(self.config.seed_reputation)?,
            );
            self.store.put_trust_record(&record)?;
            debug!(reputation = %record.reputation, "operator-seeded peer");
            return Ok(record);
        }

        let (reputation, provided_by) = match self.organisation_estimate(peer)? {
            Some(estimate) => estimate,
            None => (TrustValue::new(self.config.default_reputation)?, 0),
        };

        let record = TrustRecord::bootstrapped(peer.clone(), reputation, provided_by);
        self.store.put_trust_record(&record)?;

        if reputation.value() < self.config.min_bootstrap_confidence {
            debug!(
                reputation = %reputation,
                "estimate below confidence threshold, asking for recommendations"
            );
            self.recommendations.request_for_bootstrap(&peer.id)?;
        }

        Ok(record)
    }

    /// Recommendation-trust-weighted average reputation of connected peers
    /// sharing an organisation with `peer`. `None` without any such peer.
    fn organisation_estimate(
        &self,
        peer: &PeerIdentity,
    ) -> CredoResult<Option<(TrustValue, u32)>> {
        if !peer.shares_organisation(&self.config.local_orgs()) {
            return Ok(None);
        }

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut plain_sum = 0.0;
        let mut count = 0u32;

        for mate in self.store.get_peers_by_organisations(&peer.organisations)? {
            if mate.id == peer.id {
                continue;
            }
            let Some(record) = self.store.get_trust_record(&mate.id)? else {
                continue;
            };
            weighted_sum += record.reputation.value() * record.recommendation_trust.value();
            weight_total += record.recommendation_trust.value();
            plain_sum += record.reputation.value();
            count += 1;
        }

        if count == 0 {
            return Ok(None);
        }

        let estimate = if weight_total > 0.0 {
            weighted_sum / weight_total
        } else {
            plain_sum / f64::from(count)
        };
        Ok(Some((TrustValue::saturating(estimate), count)))
    }
}
