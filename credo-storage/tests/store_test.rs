//! Integration tests for the SQLite trust store.

use std::collections::BTreeSet;

use credo_core::models::intel::ThreatVerdict;
use credo_core::models::peer::{OrgId, PeerId, PeerIdentity};
use credo_core::models::record::TrustRecord;
use credo_core::models::trust::{HistoryRecord, ScoreValue, TrustValue};
use credo_core::traits::store::TrustStore;
use credo_storage::StorageEngine;

fn engine() -> StorageEngine {
    StorageEngine::open_in_memory().expect("open in-memory storage")
}

fn tv(v: f64) -> TrustValue {
    TrustValue::new(v).unwrap()
}

fn record_for(id: &str, reputation: f64) -> TrustRecord {
    TrustRecord::bootstrapped(
        PeerIdentity::with_organisations(id, "192.0.2.1", ["org1"]),
        tv(reputation),
        1,
    )
}

#[test]
fn trust_record_round_trips_with_histories() {
    let eng = engine();
    let store = eng.trust_store();

    let mut record = record_for("peer-a", 0.6);
    record.push_service_history(HistoryRecord::now(tv(0.9), tv(1.0)), 100);
    record.push_recommendation_history(HistoryRecord::now(tv(0.4), tv(0.7)), 100);
    store.put_trust_record(&record).unwrap();

    let loaded = store
        .get_trust_record(&PeerId::from("peer-a"))
        .unwrap()
        .expect("record exists");

    assert_eq!(loaded.peer, record.peer);
    assert_eq!(loaded.reputation, record.reputation);
    assert_eq!(loaded.service_history.len(), 1);
    assert_eq!(loaded.recommendation_history.len(), 1);
    assert!((loaded.service_history[0].satisfaction.value() - 0.9).abs() < 1e-9);
}

#[test]
fn unknown_peer_yields_none() {
    let eng = engine();
    let store = eng.trust_store();
    assert!(store
        .get_trust_record(&PeerId::from("nobody"))
        .unwrap()
        .is_none());
}

#[test]
fn rewrite_replaces_histories_atomically() {
    let eng = engine();
    let store = eng.trust_store();

    let mut record = record_for("peer-a", 0.6);
    for _ in 0..5 {
        record.push_service_history(HistoryRecord::now(tv(0.5), tv(1.0)), 100);
    }
    store.put_trust_record(&record).unwrap();

    record.service_history.clear();
    record.push_service_history(HistoryRecord::now(tv(1.0), tv(1.0)), 100);
    store.put_trust_record(&record).unwrap();

    let loaded = store
        .get_trust_record(&PeerId::from("peer-a"))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.service_history.len(), 1);
    assert!((loaded.service_history[0].satisfaction.value() - 1.0).abs() < 1e-9);
}

#[test]
fn roster_upsert_is_idempotent() {
    let eng = engine();
    let store = eng.trust_store();

    let roster = vec![
        PeerIdentity::with_organisations("peer-a", "192.0.2.1", ["org1"]),
        PeerIdentity::new("peer-b", "192.0.2.2"),
    ];

    let first = store.upsert_peer_roster(&roster).unwrap();
    assert_eq!(first.added.len(), 2);
    assert!(first.removed.is_empty());

    let second = store.upsert_peer_roster(&roster).unwrap();
    assert!(second.is_empty());
    assert_eq!(store.connected_peers().unwrap().len(), 2);
}

#[test]
fn departed_peer_keeps_record_but_leaves_selection() {
    let eng = engine();
    let store = eng.trust_store();

    store
        .upsert_peer_roster(&[
            PeerIdentity::new("peer-a", "192.0.2.1"),
            PeerIdentity::new("peer-b", "192.0.2.2"),
        ])
        .unwrap();
    store.put_trust_record(&record_for("peer-a", 0.8)).unwrap();
    store.put_trust_record(&record_for("peer-b", 0.8)).unwrap();

    // peer-b departs.
    let diff = store
        .upsert_peer_roster(&[PeerIdentity::new("peer-a", "192.0.2.1")])
        .unwrap();
    assert_eq!(diff.removed, vec![PeerId::from("peer-b")]);

    let selectable = store.list_peers_by_min_recommendation_trust(0.5).unwrap();
    assert_eq!(selectable.len(), 1);
    assert_eq!(selectable[0].id, PeerId::from("peer-a"));

    // The record survives with its history of trust intact.
    let kept = store
        .get_trust_record(&PeerId::from("peer-b"))
        .unwrap()
        .unwrap();
    assert!(!kept.connected);
    assert!((kept.reputation.value() - 0.8).abs() < 1e-9);

    // Returning peer shows up as added again.
    let diff = store
        .upsert_peer_roster(&[
            PeerIdentity::new("peer-a", "192.0.2.1"),
            PeerIdentity::new("peer-b", "192.0.2.9"),
        ])
        .unwrap();
    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.added[0].id, PeerId::from("peer-b"));
}

#[test]
fn organisation_query_filters_connected_members() {
    let eng = engine();
    let store = eng.trust_store();

    store
        .upsert_peer_roster(&[
            PeerIdentity::with_organisations("peer-a", "192.0.2.1", ["org1"]),
            PeerIdentity::with_organisations("peer-b", "192.0.2.2", ["org2"]),
        ])
        .unwrap();

    let orgs: BTreeSet<OrgId> = [OrgId::from("org1")].into_iter().collect();
    let members = store.get_peers_by_organisations(&orgs).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, PeerId::from("peer-a"));
}

#[test]
fn verdict_cache_upserts_by_target() {
    let eng = engine();
    let store = eng.trust_store();

    let mut verdict = ThreatVerdict::new(
        "198.51.100.7",
        ScoreValue::new(-0.8).unwrap(),
        tv(0.9),
    );
    store.put_threat_verdict(&verdict).unwrap();

    verdict.score = ScoreValue::new(-0.2).unwrap();
    verdict.confidentiality = Some(tv(0.5));
    store.put_threat_verdict(&verdict).unwrap();

    let loaded = store
        .get_threat_verdict("198.51.100.7")
        .unwrap()
        .expect("cached");
    assert!((loaded.score.value() + 0.2).abs() < 1e-9);
    assert_eq!(loaded.confidentiality, Some(tv(0.5)));
    assert!(store.get_threat_verdict("203.0.113.1").unwrap().is_none());
}

#[test]
fn schema_rejects_out_of_range_trust_columns() {
    let eng = engine();
    let store = eng.trust_store();
    store.put_trust_record(&record_for("peer-a", 0.5)).unwrap();

    // Bypass the typed layer: the CHECK constraint must still hold the line.
    let result = eng.pool().writer.with_conn_sync(|conn| {
        conn.execute(
            "UPDATE trust_records SET service_trust = 1.5 WHERE peer_id = 'peer-a'",
            [],
        )
        .map_err(|e| credo_core::errors::CredoError::Storage(
            credo_core::errors::StorageError::SqliteError {
                message: e.to_string(),
            },
        ))?;
        Ok(())
    });
    assert!(result.is_err());

    // Prior value preserved.
    let loaded = store
        .get_trust_record(&PeerId::from("peer-a"))
        .unwrap()
        .unwrap();
    assert!((loaded.service_trust.value() - 0.5).abs() < 1e-9);
}
