//! In-memory implementation of the AnchorRegistry trait.
//!
//! Same semantics as SQLite, plus switches to simulate an outage or a slow
//! ledger in tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use veriminutes_core::{stamp, AnchorReceipt, Sha256Hash};

use crate::error::{AnchorError, Result};
use crate::traits::{tx_ref, AnchorRecord, AnchorRegistry, AnchorRequest};

/// In-memory anchor registry.
#[derive(Debug)]
pub struct MemoryAnchorRegistry {
    submitter: String,
    inner: Mutex<BTreeMap<Sha256Hash, (AnchorRecord, AnchorReceipt)>>,
    available: AtomicBool,
    /// Calls left to fail before the registry answers again.
    failures: AtomicU32,
    latency: Mutex<Option<Duration>>,
}

impl MemoryAnchorRegistry {
    pub fn new(submitter: impl Into<String>) -> Self {
        Self {
            submitter: submitter.into(),
            inner: Mutex::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            failures: AtomicU32::new(0),
            latency: Mutex::new(None),
        }
    }

    /// Make every call fail with [`AnchorError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Fail the next `n` calls, then recover.
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Delay every call.
    pub fn set_latency(&self, latency: Option<Duration>) -> Result<()> {
        *self.latency.lock().map_err(|_| AnchorError::Poisoned)? = latency;
        Ok(())
    }

    /// Overwrite a record directly, bypassing conflict checks.
    pub fn insert_record(&self, merkle_root: Sha256Hash, record: AnchorRecord) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| AnchorError::Poisoned)?;
        let sequence = inner.len() as u64 + 1;
        let receipt = AnchorReceipt {
            registry: self.registry_id(),
            tx_ref: tx_ref(&merkle_root, &record.doc_hash, sequence),
            sequence,
            merkle_root,
            doc_hash: record.doc_hash,
            schema_id: record.schema_id.clone(),
            uri: record.uri.clone(),
            anchored_at: record.timestamp,
        };
        inner.insert(merkle_root, (record, receipt));
        Ok(())
    }

    async fn enter(&self) -> Result<()> {
        let latency = *self.latency.lock().map_err(|_| AnchorError::Poisoned)?;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(AnchorError::Unavailable("registry offline".into()));
        }
        let pending = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(AnchorError::Unavailable("transient failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AnchorRegistry for MemoryAnchorRegistry {
    fn registry_id(&self) -> String {
        "memory".to_string()
    }

    async fn submit_anchor(&self, request: &AnchorRequest) -> Result<AnchorReceipt> {
        self.enter().await?;
        let mut inner = self.inner.lock().map_err(|_| AnchorError::Poisoned)?;

        if let Some((record, receipt)) = inner.get(&request.merkle_root) {
            if record.doc_hash == request.doc_hash {
                return Ok(receipt.clone());
            }
            return Err(AnchorError::Conflict {
                merkle_root: request.merkle_root.to_hex(),
                existing: record.doc_hash.to_hex(),
                submitted: request.doc_hash.to_hex(),
            });
        }

        let sequence = inner.len() as u64 + 1;
        let anchored_at = stamp::now();
        let record = AnchorRecord {
            doc_hash: request.doc_hash,
            schema_id: request.schema_id.clone(),
            uri: request.uri.clone(),
            timestamp: anchored_at,
            submitter: self.submitter.clone(),
        };
        let receipt = AnchorReceipt {
            registry: self.registry_id(),
            tx_ref: tx_ref(&request.merkle_root, &request.doc_hash, sequence),
            sequence,
            merkle_root: request.merkle_root,
            doc_hash: request.doc_hash,
            schema_id: request.schema_id.clone(),
            uri: request.uri.clone(),
            anchored_at,
        };
        inner.insert(request.merkle_root, (record, receipt.clone()));
        Ok(receipt)
    }

    async fn get_anchor(&self, merkle_root: &Sha256Hash) -> Result<Option<AnchorRecord>> {
        self.enter().await?;
        let inner = self.inner.lock().map_err(|_| AnchorError::Poisoned)?;
        Ok(inner.get(merkle_root).map(|(record, _)| record.clone()))
    }
}
