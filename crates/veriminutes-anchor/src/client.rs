//! AnchorClient: timeouts and a bounded retry budget around a registry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use veriminutes_core::{AnchorReceipt, Sha256Hash};

use crate::error::{AnchorError, Result};
use crate::traits::{AnchorRecord, AnchorRegistry, AnchorRequest};

/// Upper bound on attempts per call.
pub const MAX_ATTEMPTS: u32 = 5;

/// Timeout and retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Attempts per call, clamped to `1..=MAX_ATTEMPTS`.
    pub max_attempts: u32,
}

impl AnchorPolicy {
    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        Self {
            timeout,
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
        }
    }
}

impl Default for AnchorPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000), 3)
    }
}

/// Registry handle used by the build and verify paths.
#[derive(Clone)]
pub struct AnchorClient {
    registry: Arc<dyn AnchorRegistry>,
    policy: AnchorPolicy,
}

impl std::fmt::Debug for AnchorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorClient")
            .field("registry", &self.registry.registry_id())
            .field("policy", &self.policy)
            .finish()
    }
}

impl AnchorClient {
    pub fn new(registry: Arc<dyn AnchorRegistry>, policy: AnchorPolicy) -> Self {
        let policy = AnchorPolicy::new(policy.timeout, policy.max_attempts);
        Self { registry, policy }
    }

    pub fn policy(&self) -> AnchorPolicy {
        self.policy
    }

    pub fn registry_id(&self) -> String {
        self.registry.registry_id()
    }

    /// Submit an anchor, retrying transient failures.
    pub async fn submit(&self, request: &AnchorRequest) -> Result<AnchorReceipt> {
        self.with_retries("submit_anchor", || self.registry.submit_anchor(request))
            .await
    }

    /// Look up the record for a root, retrying transient failures.
    pub async fn lookup(&self, merkle_root: &Sha256Hash) -> Result<Option<AnchorRecord>> {
        self.with_retries("get_anchor", || self.registry.get_anchor(merkle_root))
            .await
    }

    async fn with_retries<F, Fut, T>(&self, op: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let err = match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(Ok(value)) => {
                    debug!(op, attempt, "registry call succeeded");
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => AnchorError::Timeout(self.policy.timeout),
            };

            if !err.is_transient() || attempt >= self.policy.max_attempts {
                warn!(op, attempt, error = %err, "registry call failed");
                return Err(err);
            }
            debug!(op, attempt, error = %err, "retrying registry call");
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAnchorRegistry;

    fn request() -> AnchorRequest {
        AnchorRequest {
            merkle_root: Sha256Hash::hash(b"root"),
            doc_hash: Sha256Hash::hash(b"doc"),
            schema_id: "veriminutes.packet/v1".into(),
            uri: "file://minutes.json".into(),
        }
    }

    fn client(registry: Arc<MemoryAnchorRegistry>, timeout_ms: u64, attempts: u32) -> AnchorClient {
        AnchorClient::new(
            registry,
            AnchorPolicy::new(Duration::from_millis(timeout_ms), attempts),
        )
    }

    #[test]
    fn test_policy_clamped() {
        assert_eq!(AnchorPolicy::new(Duration::ZERO, 0).max_attempts, 1);
        assert_eq!(AnchorPolicy::new(Duration::ZERO, 99).max_attempts, MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_transient_failures_retried_within_budget() {
        let registry = Arc::new(MemoryAnchorRegistry::new("clerk"));
        registry.fail_next(2);
        let receipt = client(registry.clone(), 1000, 3).submit(&request()).await.unwrap();
        assert_eq!(receipt.sequence, 1);

        registry.fail_next(3);
        let err = client(registry, 1000, 3).lookup(&request().merkle_root).await.unwrap_err();
        assert!(matches!(err, AnchorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_conflict_not_retried() {
        let registry = Arc::new(MemoryAnchorRegistry::new("clerk"));
        let client = client(registry.clone(), 1000, 5);
        client.submit(&request()).await.unwrap();

        let mut other = request();
        other.doc_hash = Sha256Hash::hash(b"other");
        assert!(matches!(
            client.submit(&other).await,
            Err(AnchorError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_slow_registry_times_out() {
        let registry = Arc::new(MemoryAnchorRegistry::new("clerk"));
        registry.set_latency(Some(Duration::from_millis(200))).unwrap();
        let err = client(registry, 10, 2)
            .lookup(&request().merkle_root)
            .await
            .unwrap_err();
        assert!(matches!(err, AnchorError::Timeout(_)));
    }
}
