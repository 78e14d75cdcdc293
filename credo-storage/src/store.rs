//! `SqliteTrustStore` — the `TrustStore` implementation.
//!
//! All writes run on the single write connection; threshold and roster reads
//! go to the read pool when file-backed. Roster reconciliation is one
//! transaction so a concurrent writer can never observe a half-applied
//! roster.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use credo_core::errors::CredoResult;
use credo_core::models::intel::ThreatVerdict;
use credo_core::models::peer::{OrgId, PeerId, PeerIdentity};
use credo_core::models::record::TrustRecord;
use credo_core::traits::store::{RosterDiff, TrustStore};

use crate::pool::ConnectionPool;
use crate::queries::{peer_ops, trust_ops, verdict_ops};
use crate::to_storage_err;

/// SQLite-backed trust store.
#[derive(Clone)]
pub struct SqliteTrustStore {
    pool: Arc<ConnectionPool>,
}

impl SqliteTrustStore {
    /// Wrap an already-migrated connection pool.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

impl TrustStore for SqliteTrustStore {
    #[instrument(skip(self))]
    fn get_trust_record(&self, peer: &PeerId) -> CredoResult<Option<TrustRecord>> {
        self.pool
            .with_read(|conn| trust_ops::get_trust_record(conn, peer))
    }

    #[instrument(skip(self, record), fields(peer = %record.peer.id))]
    fn put_trust_record(&self, record: &TrustRecord) -> CredoResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| trust_ops::put_trust_record(conn, record))
    }

    fn list_peers_by_min_recommendation_trust(
        &self,
        threshold: f64,
    ) -> CredoResult<Vec<PeerIdentity>> {
        self.pool
            .with_read(|conn| peer_ops::peers_by_min_recommendation_trust(conn, threshold))
    }

    fn list_peers_by_min_service_trust(&self, threshold: f64) -> CredoResult<Vec<PeerIdentity>> {
        self.pool
            .with_read(|conn| peer_ops::peers_by_min_service_trust(conn, threshold))
    }

    fn get_peers_by_organisations(&self, orgs: &BTreeSet<OrgId>) -> CredoResult<Vec<PeerIdentity>> {
        self.pool
            .with_read(|conn| peer_ops::peers_by_organisations(conn, orgs))
    }

    fn connected_peers(&self) -> CredoResult<Vec<PeerIdentity>> {
        self.pool.with_read(peer_ops::connected_peers)
    }

    #[instrument(skip(self, peers), fields(roster_size = peers.len()))]
    fn upsert_peer_roster(&self, peers: &[PeerIdentity]) -> CredoResult<RosterDiff> {
        self.pool.writer.with_conn_sync(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| to_storage_err(format!("upsert_peer_roster begin: {e}")))?;

            let before = peer_ops::connected_peer_ids(&tx)?;
            let incoming: BTreeSet<PeerId> = peers.iter().map(|p| p.id.clone()).collect();

            let mut diff = RosterDiff::default();
            for peer in peers {
                if !before.contains(&peer.id) {
                    diff.added.push(peer.clone());
                }
                peer_ops::upsert_peer(&tx, peer)?;
            }
            for gone in before.difference(&incoming) {
                peer_ops::set_connected(&tx, gone, false)?;
                diff.removed.push(gone.clone());
            }

            tx.commit()
                .map_err(|e| to_storage_err(format!("upsert_peer_roster commit: {e}")))?;

            debug!(
                added = diff.added.len(),
                removed = diff.removed.len(),
                "roster reconciled"
            );
            Ok(diff)
        })
    }

    fn get_threat_verdict(&self, target: &str) -> CredoResult<Option<ThreatVerdict>> {
        self.pool
            .with_read(|conn| verdict_ops::get_verdict(conn, target))
    }

    #[instrument(skip(self, verdict), fields(target = %verdict.target))]
    fn put_threat_verdict(&self, verdict: &ThreatVerdict) -> CredoResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| verdict_ops::upsert_verdict(conn, verdict))
    }
}
