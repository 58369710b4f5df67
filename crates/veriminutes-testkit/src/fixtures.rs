//! Test fixtures and helpers.
//!
//! Common setup code for integration tests and benchmarks.

use std::path::Path;
use std::sync::Arc;

use rand::RngCore;
use serde_json::{json, Value};
use tempfile::TempDir;

use veriminutes::{Notary, NotaryConfig, StaticKeyProvider};
use veriminutes_core::{
    canonical_json, digest_all, AssembledPacket, Credential, Ed25519PublicKey, Keypair,
    MerkleProof, MerkleTree, PacketAssembler, TranscriptRef, VerificationPacket,
};
use veriminutes_store::{BlobStore, MemoryStore};

pub const TRANSCRIPT_NAME: &str = "transcript.json";

/// Standard minutes used across tests.
pub fn sample_minutes() -> Value {
    json!({
        "title": "Q3 Board Meeting",
        "date": "2025-09-12",
        "attendees": ["Alice", "Bob", "Carol"],
        "motions": [{"text": "Approve Q3 budget", "result": "carried", "mover": "Bob"}],
        "actions": [{"owner": "Carol", "item": "Circulate final numbers"}]
    })
}

/// Standard transcript bytes.
pub fn sample_transcript() -> Vec<u8> {
    canonical_json(&json!({
        "segments": [
            {"speaker": "Alice", "text": "Call to order."},
            {"speaker": "Bob", "text": "Motion to approve the budget."},
            {"speaker": "Carol", "text": "Seconded."}
        ]
    }))
}

/// `len` random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// A keypair and an in-memory CAS, for building packets without disk I/O.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::from_keypair(Keypair::from_seed(&seed))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair,
            store: Arc::new(MemoryStore::new()),
        }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// Sign and prove canonical minutes bytes; proves leaf 0.
    pub fn assemble(&self, minutes_bytes: &[u8], transcript: &[u8]) -> AssembledPacket {
        let credential = Credential::issue(
            &self.keypair,
            digest_all(minutes_bytes),
            minutes_bytes.len() as u64,
        );
        let proof = MerkleProof::from_tree(&MerkleTree::build(minutes_bytes), 0)
            .expect("leaf 0 always exists");
        PacketAssembler::new(minutes_bytes.to_vec())
            .transcript(TranscriptRef::for_bytes(TRANSCRIPT_NAME, transcript))
            .credential(credential)
            .proof(proof)
            .assemble()
            .expect("fixture minutes are canonical")
    }

    /// Build a packet for `minutes` and store both documents in the CAS.
    pub fn packet(&self, minutes: &Value) -> VerificationPacket {
        let bytes = canonical_json(minutes);
        let transcript = sample_transcript();
        self.store.put_all(&bytes).expect("memory store");
        self.store.put_all(&transcript).expect("memory store");
        self.assemble(&bytes, &transcript).packet
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Default configuration with every path under `dir`.
pub fn session_config(dir: &Path) -> NotaryConfig {
    let mut config = NotaryConfig::default();
    config.storage.output_dir = dir.join("output");
    config.keys.path = dir.join("keys/ed25519.key");
    config.anchoring.registry_path = dir.join("anchors.db");
    config
}

/// A notary signing with a fixed key.
pub fn seeded_notary(config: NotaryConfig) -> Notary {
    let keys = Arc::new(StaticKeyProvider::new(Keypair::from_seed(&[0x42; 32])));
    Notary::new(config, keys).expect("notary")
}

/// Notarize and persist `minutes` with the sample transcript.
pub async fn notarize_session(
    notary: &Notary,
    slug: &str,
    minutes: &Value,
) -> VerificationPacket {
    let transcript = sample_transcript();
    let assembled = notary
        .notarize(slug, minutes, TRANSCRIPT_NAME, &transcript)
        .await
        .expect("notarize");
    notary
        .persist(slug, &assembled, &transcript)
        .expect("persist");
    assembled.packet
}

/// A notary writing into a temporary output directory.
pub struct SessionFixture {
    pub dir: TempDir,
    pub notary: Notary,
}

impl SessionFixture {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Adjust the default configuration before the notary opens.
    pub fn with_config(adjust: impl FnOnce(&mut NotaryConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = session_config(dir.path());
        adjust(&mut config);
        let notary = seeded_notary(config);
        Self { dir, notary }
    }

    pub async fn notarize(&self, slug: &str, minutes: &Value) -> VerificationPacket {
        notarize_session(&self.notary, slug, minutes).await
    }
}

impl Default for SessionFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixtures with distinct deterministic signers.
pub fn multi_signer_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriminutes::{VerificationPipeline, VerifyOptions};

    #[test]
    fn test_fixture_packet_verifies_against_store() {
        let fixture = TestFixture::new();
        let packet = fixture.packet(&sample_minutes());
        let store: Arc<dyn BlobStore> = fixture.store.clone();

        let result = VerificationPipeline::new()
            .with_store(store)
            .with_options(VerifyOptions {
                require_cas: true,
                ..VerifyOptions::default()
            })
            .verify_local(&packet);
        assert!(result.valid, "{}", result);
        assert!(result.storage.passed());
    }

    #[test]
    fn test_signers_are_distinct() {
        let fixtures = multi_signer_fixtures(3);
        assert_ne!(fixtures[0].public_key(), fixtures[1].public_key());
        assert_ne!(fixtures[1].public_key(), fixtures[2].public_key());
    }

    #[tokio::test]
    async fn test_session_fixture_roundtrip() {
        let fixture = SessionFixture::new();
        fixture.notarize("2025-09-12", &sample_minutes()).await;

        let result = fixture.notary.verify_session("2025-09-12").await.unwrap();
        assert!(result.valid);
        assert_eq!(
            fixture.notary.sessions().list_sessions().unwrap(),
            vec!["2025-09-12".to_string()]
        );
    }
}
