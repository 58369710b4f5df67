//! Database schema migrations for the SQLite anchor ledger.
//!
//! Each migration is a SQL batch that moves the schema from version N to N+1.

use rusqlite::Connection;
use veriminutes_core::stamp;

use crate::error::{AnchorError, Result};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, stamp::format(&stamp::now())],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(AnchorError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: anchors table.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE anchors (
            sequence INTEGER PRIMARY KEY AUTOINCREMENT,
            merkle_root BLOB NOT NULL UNIQUE,  -- 32 bytes, sha256
            doc_hash BLOB NOT NULL,            -- 32 bytes, sha256 of minutes
            schema_id TEXT NOT NULL,
            uri TEXT NOT NULL,
            submitter TEXT NOT NULL,
            tx_ref TEXT NOT NULL,
            anchored_at TEXT NOT NULL          -- RFC 3339, microseconds
        );

        CREATE INDEX idx_anchors_doc_hash ON anchors(doc_hash);
        "#,
    )?;

    Ok(())
}
