//! SQLite implementation of the AnchorRegistry trait.
//!
//! Emulates a ledger locally: append-only rows keyed by Merkle root. Uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use veriminutes_core::{stamp, AnchorReceipt, Sha256Hash};

use crate::error::{AnchorError, Result};
use crate::migration;
use crate::traits::{tx_ref, AnchorRecord, AnchorRegistry, AnchorRequest};

/// SQLite-backed anchor registry.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteAnchorRegistry {
    conn: Arc<Mutex<Connection>>,
    registry_id: String,
    submitter: String,
}

impl SqliteAnchorRegistry {
    /// Open a ledger database at the given path, creating and migrating it if needed.
    pub fn open(path: impl AsRef<Path>, submitter: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            registry_id: format!("sqlite:{}", path.display()),
            submitter: submitter.into(),
        })
    }

    /// Open an in-memory ledger. Useful for testing.
    pub fn open_memory(submitter: impl Into<String>) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            registry_id: "sqlite::memory:".to_string(),
            submitter: submitter.into(),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| AnchorError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| AnchorError::Join(e.to_string()))?
    }
}

struct AnchorRow {
    sequence: u64,
    doc_hash: Sha256Hash,
    schema_id: String,
    uri: String,
    submitter: String,
    tx_ref: String,
    anchored_at: DateTime<Utc>,
}

fn hash_column(bytes: Vec<u8>, column: &str) -> Result<Sha256Hash> {
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| AnchorError::InvalidData(format!("{} is not 32 bytes", column)))?;
    Ok(Sha256Hash::from_bytes(bytes))
}

fn select_anchor(conn: &Connection, merkle_root: &Sha256Hash) -> Result<Option<AnchorRow>> {
    let raw = conn
        .query_row(
            "SELECT sequence, doc_hash, schema_id, uri, submitter, tx_ref, anchored_at
             FROM anchors WHERE merkle_root = ?1",
            params![merkle_root.as_bytes().as_slice()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;

    let Some((sequence, doc_hash, schema_id, uri, submitter, tx_ref, anchored_at)) = raw else {
        return Ok(None);
    };

    let anchored_at = DateTime::parse_from_rfc3339(&anchored_at)
        .map_err(|e| AnchorError::InvalidData(format!("anchored_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(Some(AnchorRow {
        sequence: sequence as u64,
        doc_hash: hash_column(doc_hash, "doc_hash")?,
        schema_id,
        uri,
        submitter,
        tx_ref,
        anchored_at,
    }))
}

impl AnchorRow {
    fn receipt(self, registry: String, merkle_root: Sha256Hash) -> AnchorReceipt {
        AnchorReceipt {
            registry,
            tx_ref: self.tx_ref,
            sequence: self.sequence,
            merkle_root,
            doc_hash: self.doc_hash,
            schema_id: self.schema_id,
            uri: self.uri,
            anchored_at: self.anchored_at,
        }
    }
}

#[async_trait]
impl AnchorRegistry for SqliteAnchorRegistry {
    fn registry_id(&self) -> String {
        self.registry_id.clone()
    }

    async fn submit_anchor(&self, request: &AnchorRequest) -> Result<AnchorReceipt> {
        let request = request.clone();
        let registry = self.registry_id.clone();
        let submitter = self.submitter.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            if let Some(existing) = select_anchor(&tx, &request.merkle_root)? {
                if existing.doc_hash != request.doc_hash {
                    return Err(AnchorError::Conflict {
                        merkle_root: request.merkle_root.to_hex(),
                        existing: existing.doc_hash.to_hex(),
                        submitted: request.doc_hash.to_hex(),
                    });
                }
                debug!(root = %request.merkle_root, "anchor already recorded");
                return Ok(existing.receipt(registry, request.merkle_root));
            }

            let sequence: i64 = tx.query_row(
                "SELECT COALESCE(MAX(sequence), 0) + 1 FROM anchors",
                [],
                |row| row.get(0),
            )?;
            let sequence = sequence as u64;
            let tx_ref = tx_ref(&request.merkle_root, &request.doc_hash, sequence);
            let anchored_at = stamp::now();

            tx.execute(
                "INSERT INTO anchors (
                    sequence, merkle_root, doc_hash, schema_id, uri, submitter, tx_ref, anchored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    sequence as i64,
                    request.merkle_root.as_bytes().as_slice(),
                    request.doc_hash.as_bytes().as_slice(),
                    request.schema_id,
                    request.uri,
                    submitter,
                    tx_ref,
                    stamp::format(&anchored_at),
                ],
            )?;
            tx.commit()?;
            debug!(root = %request.merkle_root, sequence, "anchor recorded");

            Ok(AnchorReceipt {
                registry,
                tx_ref,
                sequence,
                merkle_root: request.merkle_root,
                doc_hash: request.doc_hash,
                schema_id: request.schema_id,
                uri: request.uri,
                anchored_at,
            })
        })
        .await
    }

    async fn get_anchor(&self, merkle_root: &Sha256Hash) -> Result<Option<AnchorRecord>> {
        let merkle_root = *merkle_root;
        self.blocking(move |conn| {
            Ok(select_anchor(conn, &merkle_root)?.map(|row| AnchorRecord {
                doc_hash: row.doc_hash,
                schema_id: row.schema_id,
                uri: row.uri,
                timestamp: row.anchored_at,
                submitter: row.submitter,
            }))
        })
        .await
    }
}
