use rusqlite::Connection;
use timeline_core::db::migrations::schema_version;
use timeline_core::db::{open_db, open_db_in_memory, DbError};
use timeline_core::{BlobStorage, SqliteBlobStorage, STORAGE_KEY};

#[test]
fn fresh_database_gets_the_local_storage_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(user_version(&conn), schema_version());
    let mut stmt = conn
        .prepare("SELECT name, pk FROM pragma_table_info('local_storage') ORDER BY cid;")
        .unwrap();
    let columns: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        columns,
        vec![
            ("key".to_string(), 1),
            ("value".to_string(), 0),
            ("updated_at".to_string(), 0),
        ]
    );
}

#[test]
fn local_storage_refuses_empty_keys_and_stamps_writes() {
    let conn = open_db_in_memory().unwrap();

    let empty_key = conn.execute(
        "INSERT INTO local_storage (key, value) VALUES ('', '[]');",
        [],
    );
    assert!(empty_key.is_err());

    conn.execute(
        "INSERT INTO local_storage (key, value) VALUES (?1, '[]');",
        [STORAGE_KEY],
    )
    .unwrap();
    let updated_at: i64 = conn
        .query_row(
            "SELECT updated_at FROM local_storage WHERE key = ?1;",
            [STORAGE_KEY],
            |row| row.get(0),
        )
        .unwrap();
    assert!(updated_at > 0);
}

#[test]
fn blob_written_before_reopen_is_read_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeline.sqlite3");

    {
        let conn = open_db(&path).unwrap();
        let storage = SqliteBlobStorage::new(&conn);
        storage.set_item(STORAGE_KEY, "[1]").unwrap();
        storage.set_item(STORAGE_KEY, "[2]").unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(user_version(&conn), schema_version());
    let storage = SqliteBlobStorage::new(&conn);
    assert_eq!(storage.get_item(STORAGE_KEY).unwrap().as_deref(), Some("[2]"));
}

#[test]
fn file_from_a_newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("newer.sqlite3");
    let ahead = schema_version() + 1;

    Connection::open(&path)
        .unwrap()
        .pragma_update(None, "user_version", ahead)
        .unwrap();

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, ahead);
            assert_eq!(supported, schema_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn user_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}
