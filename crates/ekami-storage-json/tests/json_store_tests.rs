use std::fs;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use ekami_core::{
    store::{collections, from_record, record_id, to_record, Query, RecordStore, SortOrder},
    CommentService, CoreError, FixedClock, IntakeField, IntakeSession, StaticIdentity,
    SubmissionCoordinator, SubmissionSettings, DisabledNotifier,
};
use ekami_domain::{Identity, RepairRequest};
use ekami_storage_json::{JsonRecordStore, StoragePaths};
use serde_json::json;
use tempfile::tempdir;
use uuid::Uuid;

fn row(value: serde_json::Value) -> ekami_core::Record {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("rows must be objects"),
    }
}

#[test]
fn json_store_persists_rows_across_instances() {
    let dir = tempdir().expect("tempdir");
    let paths = StoragePaths::under(dir.path());
    {
        let store = JsonRecordStore::new(paths.clone()).expect("create store");
        store
            .insert("vehicles", row(json!({"id": "a", "make": "Toyota", "year": 2019})))
            .expect("insert a");
        store
            .insert("vehicles", row(json!({"id": "b", "make": "Kia", "year": 2022})))
            .expect("insert b");
    }

    let reopened = JsonRecordStore::new(paths).expect("reopen store");
    let rows = reopened
        .select(
            "vehicles",
            &Query::new().order_by("year", SortOrder::Descending),
        )
        .expect("select");
    let ids: Vec<_> = rows.iter().filter_map(record_id).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(reopened.collections().unwrap(), vec!["vehicles".to_string()]);
    assert!(reopened.collection_path("vehicles").exists());
}

#[test]
fn json_store_updates_and_deletes_rows() {
    let dir = tempdir().expect("tempdir");
    let store = JsonRecordStore::new(StoragePaths::under(dir.path())).expect("create store");
    store
        .insert("vehicles", row(json!({"id": "a", "km": 10})))
        .expect("insert");

    store
        .update("vehicles", "a", row(json!({"id": "a", "km": 20})))
        .expect("update");
    let updated = store.get("vehicles", "a").expect("get").expect("row");
    assert_eq!(updated.get("km"), Some(&json!(20)));

    assert!(matches!(
        store.update("vehicles", "missing", row(json!({"id": "missing"}))),
        Err(CoreError::NotFound { .. })
    ));
    assert!(store.delete("vehicles", "a").expect("delete"));
    assert!(store.get("vehicles", "a").expect("get").is_none());
}

#[test]
fn json_store_insert_once_deduplicates_by_key() {
    let dir = tempdir().expect("tempdir");
    let store = JsonRecordStore::new(StoragePaths::under(dir.path())).expect("create store");

    let first = store
        .insert_once("jobs", "key", "k-1", row(json!({"id": "1", "key": "k-1"})))
        .expect("first insert");
    let second = store
        .insert_once("jobs", "key", "k-1", row(json!({"id": "2", "key": "k-1"})))
        .expect("second insert");

    assert!(first.was_created());
    assert!(!second.was_created());
    assert_eq!(store.select("jobs", &Query::new()).unwrap().len(), 1);
}

#[test]
fn json_store_reports_corrupt_collections() {
    let dir = tempdir().expect("tempdir");
    let store = JsonRecordStore::new(StoragePaths::under(dir.path())).expect("create store");
    fs::write(store.collection_path("broken"), "{ not json").expect("write junk");

    let err = store.select("broken", &Query::new()).unwrap_err();
    assert!(matches!(err, CoreError::Serde(_)));
}

#[test]
fn json_store_snapshots_restore_and_prune() {
    let dir = tempdir().expect("tempdir");
    let store = JsonRecordStore::with_retention(StoragePaths::under(dir.path()), 2)
        .expect("create store");
    store
        .insert("vehicles", row(json!({"id": "a"})))
        .expect("insert");

    let snapshot = store.snapshot("vehicles").expect("snapshot");
    store
        .insert("vehicles", row(json!({"id": "b"})))
        .expect("insert b");

    let restored = store.restore_snapshot(&snapshot).expect("restore");
    assert_eq!(restored, 1);
    assert!(store.get("vehicles", "b").unwrap().is_none());

    store.snapshot("vehicles").expect("second snapshot");
    store.snapshot("vehicles").expect("third snapshot");
    let snapshots = store.list_snapshots("vehicles").expect("list");
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots.iter().all(|info| info.created_at.is_some()));
}

#[test]
fn submission_coordinator_writes_through_json_store() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(JsonRecordStore::new(StoragePaths::under(dir.path())).expect("store"));
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 7, 0, 0).unwrap()));
    let identity = Arc::new(StaticIdentity::signed_in(Identity::new(
        "user-7",
        "Njoh",
        "njoh@example.com",
    )));
    let coordinator = SubmissionCoordinator::new(
        store.clone(),
        identity,
        Arc::new(DisabledNotifier),
        clock,
        SubmissionSettings::default(),
    );

    let mut session = IntakeSession::default();
    for (key, value) in [
        ("custom-service", "Replace cracked windscreen"),
        ("make", "Peugeot"),
        ("model", "301"),
        ("description", "Crack across the driver side"),
        ("date", "2025-06-03"),
        ("time", "14:30"),
        ("location", "mobile"),
        ("name", "Njoh"),
        ("email", "njoh@example.com"),
        ("phone", "677000000"),
    ] {
        session
            .update(IntakeField::from_input(key, value).expect("parse field"))
            .expect("update field");
    }
    while !session.sequencer().is_last_step() {
        session.advance().expect("advance");
    }
    let retry = session.clone();

    let receipt = coordinator.submit(session).expect("submit");
    let again = coordinator.submit(retry).expect("retry");

    assert_eq!(receipt.request.id, again.request.id);
    let rows = store
        .select(collections::REPAIR_REQUESTS, &Query::new())
        .expect("select");
    assert_eq!(rows.len(), 1);
    let stored: RepairRequest = from_record(rows[0].clone()).expect("decode");
    assert_eq!(stored.custom_service.as_deref(), Some("Replace cracked windscreen"));
    assert_eq!(to_record(&stored).unwrap(), rows[0]);
}

#[test]
fn comment_threads_survive_a_reopen() {
    let dir = tempdir().expect("tempdir");
    let paths = StoragePaths::under(dir.path());
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 7, 0, 0).unwrap()));
    let post_id = Uuid::new_v4();
    let author = Identity::new("u-1", "Ada", "ada@example.com");

    {
        let store = Arc::new(JsonRecordStore::new(paths.clone()).expect("store"));
        let service = CommentService::new(store, clock.clone());
        let mut tree = service.load_thread(post_id, None).expect("load");
        let root = service
            .post(&mut tree, post_id, &author, "Root", None)
            .expect("post root");
        service
            .post(&mut tree, post_id, &author, "Reply", Some(root.id))
            .expect("post reply");
    }

    let store = Arc::new(JsonRecordStore::new(paths).expect("reopen"));
    let service = CommentService::new(store, clock);
    let tree = service.load_thread(post_id, None).expect("reload");
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.roots()[0].replies[0].comment.content, "Reply");
}
