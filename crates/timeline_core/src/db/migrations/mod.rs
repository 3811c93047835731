//! Numbered schema steps for the timeline database.
//!
//! `STEPS[n]` moves a file from schema `n` to `n + 1`; the reached schema is
//! stored in `PRAGMA user_version`. Steps are append-only.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

const STEPS: &[&str] = &[include_str!("0001_local_storage.sql")];

/// Schema this build creates and reads.
pub fn schema_version() -> u32 {
    STEPS.len() as u32
}

/// Runs the steps the file has not seen yet, in one transaction.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let target = schema_version();
    if found > target {
        return Err(DbError::SchemaTooNew {
            found,
            supported: target,
        });
    }

    let pending = &STEPS[found as usize..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step)?;
    }
    tx.pragma_update(None, "user_version", target)?;
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_schema={} to_schema={} steps={}",
        found,
        target,
        pending.len()
    );
    Ok(())
}
