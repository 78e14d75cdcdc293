//! Peer roster reconciliation.

use std::sync::Arc;

use tracing::{debug, instrument};

use credo_core::errors::CredoResult;
use credo_core::models::peer::PeerId;
use credo_core::traits::store::TrustStore;

use credo_bus::messages::PeerListUpdate;

use crate::protocols::bootstrap::InitialTrustProtocol;
use crate::protocols::decode_payload;

/// Applies roster pushes: bootstrap newcomers, disconnect the departed.
pub struct RosterProtocol {
    store: Arc<dyn TrustStore>,
    bootstrap: Arc<InitialTrustProtocol>,
}

impl RosterProtocol {
    pub fn new(store: Arc<dyn TrustStore>, bootstrap: Arc<InitialTrustProtocol>) -> Self {
        Self { store, bootstrap }
    }

    /// Reconcile the known peer set against a pushed roster.
    ///
    /// Departed peers keep their records (trust history has residual value)
    /// but leave the selectable set. Idempotent: the same roster twice
    /// changes nothing the second time.
    #[instrument(skip(self, payload))]
    pub fn handle_peer_list_update(
        &self,
        _from: PeerId,
        payload: serde_json::Value,
    ) -> CredoResult<()> {
        let Some(update) = decode_payload::<PeerListUpdate>("peer_list_update", payload) else {
            return Ok(());
        };

        let diff = self.store.upsert_peer_roster(&update.peers)?;
        if diff.is_empty() {
            debug!(roster_size = update.peers.len(), "roster unchanged");
            return Ok(());
        }

        for peer in &diff.added {
            self.bootstrap.bootstrap(peer)?;
        }

        debug!(
            joined = diff.added.len(),
            departed = diff.removed.len(),
            "roster applied"
        );
        Ok(())
    }
}
