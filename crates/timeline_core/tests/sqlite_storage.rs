use chrono::{TimeZone, Utc};
use timeline_core::db::{open_db, open_db_in_memory};
use timeline_core::{
    BlobStorage, FixedClock, LoadSource, NewTask, RecordingNotifier, SeedPolicy,
    SqliteBlobStorage, StorageError, TimelinePersistence, TimelineStore, STORAGE_KEY,
};

#[test]
fn set_item_upserts_and_remove_item_deletes() {
    let conn = open_db_in_memory().unwrap();
    let storage = SqliteBlobStorage::new(&conn);

    assert_eq!(storage.get_item("k").unwrap(), None);
    storage.set_item("k", "first").unwrap();
    storage.set_item("k", "second").unwrap();
    assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("second"));

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM local_storage;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);

    storage.remove_item("k").unwrap();
    assert_eq!(storage.get_item("k").unwrap(), None);
}

#[test]
fn blank_key_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let storage = SqliteBlobStorage::new(&conn);
    assert!(matches!(
        storage.get_item(" "),
        Err(StorageError::InvalidKey(_))
    ));
}

#[test]
fn store_state_survives_reopening_the_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeline.sqlite3");
    let notifier = RecordingNotifier::new();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());

    let expected = {
        let conn = open_db(&path).unwrap();
        let persistence =
            TimelinePersistence::new(SqliteBlobStorage::new(&conn), SeedPolicy::Samples);
        let mut store = TimelineStore::open(persistence, &notifier, &clock);
        store
            .add(NewTask::todo("Renew passport").with_description("before June"))
            .unwrap();
        store.records().to_vec()
    };
    assert_eq!(expected.len(), 4);

    let conn = open_db(&path).unwrap();
    let persistence = TimelinePersistence::new(SqliteBlobStorage::new(&conn), SeedPolicy::Empty);
    let loaded = persistence.load();
    assert_eq!(loaded.source, LoadSource::Stored);
    assert_eq!(loaded.records, expected);
}

#[test]
fn malformed_stored_records_are_skipped_individually() {
    let conn = open_db_in_memory().unwrap();
    let storage = SqliteBlobStorage::new(&conn);
    storage
        .set_item(
            STORAGE_KEY,
            r#"[
                {"id":"11111111-2222-4333-8444-555555555555","title":"good","completionDate":"2024-01-15T00:00:00Z"},
                {"id":"11111111-2222-4333-8444-555555555556","title":"bad date","completionDate":"15/01/2024"},
                {"id":"1","title":"legacy id","completionDate":"2024-01-15T00:00:00Z"},
                {"id":"11111111-2222-4333-8444-555555555555","title":"dup id","completionDate":"2024-01-16T00:00:00Z"}
            ]"#,
        )
        .unwrap();

    let loaded = TimelinePersistence::new(storage, SeedPolicy::Samples).load();
    assert_eq!(loaded.source, LoadSource::Stored);
    assert_eq!(loaded.skipped, 2);
    let titles: Vec<&str> = loaded.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["good", "legacy id"]);
}

#[test]
fn timestamp_ids_from_older_blobs_load_and_survive_a_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeline.sqlite3");
    let blob = r#"[
        {"id":"1705312800000","title":"Shipped the beta","description":"","date":"2024-01-15T00:00:00.000Z","type":"accomplishment","completed":true},
        {"id":"2","title":"Plan retro","description":"with the team","date":"2024-01-20T00:00:00.000Z","type":"todo","completed":false}
    ]"#;

    let first_ids = {
        let conn = open_db(&path).unwrap();
        let storage = SqliteBlobStorage::new(&conn);
        storage.set_item(STORAGE_KEY, blob).unwrap();

        let notifier = RecordingNotifier::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap());
        let persistence = TimelinePersistence::new(storage, SeedPolicy::Samples);
        let mut store = TimelineStore::open(persistence, &notifier, &clock);
        assert_eq!(store.len(), 2);
        assert!(store.records()[1].is_pending());

        let pending = store.records()[1].id;
        store.complete(pending).unwrap();
        store
            .records()
            .iter()
            .map(|record| record.id)
            .collect::<Vec<_>>()
    };

    let conn = open_db(&path).unwrap();
    let loaded = TimelinePersistence::new(SqliteBlobStorage::new(&conn), SeedPolicy::Empty).load();
    assert_eq!(loaded.source, LoadSource::Stored);
    assert_eq!(loaded.skipped, 0);
    let ids: Vec<_> = loaded.records.iter().map(|record| record.id).collect();
    assert_eq!(ids, first_ids);
    assert_eq!(loaded.records[0].title, "Shipped the beta");
    assert!(loaded.records[1].completed);
}
