//! The verification pipeline.
//!
//! A packet is checked layer by layer. Every layer produces its own
//! [`LayerReport`]; the aggregate verdict is true iff every mandatory layer
//! passed.
//!
//! | Layer      | Mandatory                                 |
//! |------------|-------------------------------------------|
//! | hash       | always                                    |
//! | signature  | always                                    |
//! | proof      | always                                    |
//! | storage    | with `require_cas`                        |
//! | transcript | when transcript bytes are supplied        |
//! | anchor     | only when anchoring is declared mandatory |

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use veriminutes_anchor::AnchorClient;
use veriminutes_core::{
    chunk_leaf, digest_all, verify_inclusion, DigestPair, HashAlgorithm, MerkleTree,
    VerificationPacket,
};
use veriminutes_store::{BlobStore, StoreError};

/// Why a layer failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFailure {
    #[error("{algorithm} of minutes is {actual}, credential claims {expected}")]
    HashMismatch {
        algorithm: HashAlgorithm,
        expected: String,
        actual: String,
    },

    #[error("signature does not verify under the embedded public key")]
    SignatureInvalid,

    #[error("Merkle proof invalid: {0}")]
    ProofInvalid(String),

    #[error("CAS blob corrupted: {0}")]
    BlobCorrupted(String),

    #[error("CAS blob missing: {0}")]
    BlobMissing(String),

    #[error("transcript does not match its reference: {0}")]
    TranscriptMismatch(String),

    #[error("anchor unavailable: {0}")]
    AnchorUnavailable(String),

    #[error("anchor mismatch: {0}")]
    AnchorMismatch(String),
}

/// Why a layer did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No anchor client configured.
    AnchoringDisabled,
    /// The packet carries no anchor receipt.
    NotAnchored,
    /// Local verification never contacts a registry.
    LocalOnly,
    /// No content-addressable store to cross-check against.
    NoStore,
    /// No transcript bytes supplied.
    NoTranscript,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum LayerOutcome {
    Passed,
    Failed(VerificationFailure),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerReport {
    pub outcome: LayerOutcome,
    /// Whether this layer counts towards the aggregate verdict.
    pub mandatory: bool,
}

impl LayerReport {
    fn new(outcome: LayerOutcome, mandatory: bool) -> Self {
        Self { outcome, mandatory }
    }

    fn from_check(check: Result<(), VerificationFailure>, mandatory: bool) -> Self {
        match check {
            Ok(()) => Self::new(LayerOutcome::Passed, mandatory),
            Err(failure) => Self::new(LayerOutcome::Failed(failure), mandatory),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == LayerOutcome::Passed
    }

    pub fn failure(&self) -> Option<&VerificationFailure> {
        match &self.outcome {
            LayerOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, LayerOutcome::Skipped(_))
    }

    /// A mandatory layer must have run and passed.
    fn satisfied(&self) -> bool {
        !self.mandatory || self.passed()
    }
}

/// Itemized outcome of verifying one packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub hash: LayerReport,
    pub signature: LayerReport,
    pub proof: LayerReport,
    pub storage: LayerReport,
    pub transcript: LayerReport,
    pub anchor: LayerReport,
    /// True iff every mandatory layer passed.
    pub valid: bool,
}

impl VerificationResult {
    fn new(
        hash: LayerReport,
        signature: LayerReport,
        proof: LayerReport,
        storage: LayerReport,
        transcript: LayerReport,
        anchor: LayerReport,
    ) -> Self {
        let mut result = Self {
            hash,
            signature,
            proof,
            storage,
            transcript,
            anchor,
            valid: false,
        };
        result.valid = result.layers().iter().all(|(_, layer)| layer.satisfied());
        result
    }

    /// All layers, in evaluation order.
    pub fn layers(&self) -> [(&'static str, &LayerReport); 6] {
        [
            ("hash", &self.hash),
            ("signature", &self.signature),
            ("proof", &self.proof),
            ("storage", &self.storage),
            ("transcript", &self.transcript),
            ("anchor", &self.anchor),
        ]
    }

    /// Every failure, mandatory or advisory.
    pub fn failures(&self) -> Vec<(&'static str, &VerificationFailure)> {
        self.layers()
            .into_iter()
            .filter_map(|(name, layer)| layer.failure().map(|f| (name, f)))
            .collect()
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "verdict: {}", if self.valid { "VALID" } else { "INVALID" })?;
        for (name, layer) in self.layers() {
            let tag = if layer.mandatory { "" } else { " (advisory)" };
            match &layer.outcome {
                LayerOutcome::Passed => writeln!(f, "  {}{}: passed", name, tag)?,
                LayerOutcome::Failed(failure) => {
                    writeln!(f, "  {}{}: FAILED: {}", name, tag, failure)?
                }
                LayerOutcome::Skipped(reason) => {
                    writeln!(f, "  {}{}: skipped ({:?})", name, tag, reason)?
                }
            }
        }
        Ok(())
    }
}

/// Which optional layers count towards the verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// The storage layer is mandatory.
    pub require_cas: bool,
    /// The anchor layer is mandatory.
    pub anchor_mandatory: bool,
}

/// Runs the verification layers over a packet.
///
/// The hash, signature and proof layers need nothing but the packet. The
/// storage layer needs a [`BlobStore`], the anchor layer an [`AnchorClient`].
#[derive(Clone, Default)]
pub struct VerificationPipeline {
    options: VerifyOptions,
    store: Option<Arc<dyn BlobStore>>,
    anchor: Option<AnchorClient>,
}

impl fmt::Debug for VerificationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationPipeline")
            .field("options", &self.options)
            .field("store", &self.store.is_some())
            .field("anchor", &self.anchor)
            .finish()
    }
}

impl VerificationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_anchor_client(mut self, client: AnchorClient) -> Self {
        self.anchor = Some(client);
        self
    }

    pub fn options(&self) -> VerifyOptions {
        self.options
    }

    /// Verify the packet's embedded minutes without contacting a registry.
    pub fn verify_local(&self, packet: &VerificationPacket) -> VerificationResult {
        self.verify_detached(packet, &packet.minutes_bytes(), None)
    }

    /// Verify externally supplied minutes (and optionally transcript) bytes
    /// against the packet, without contacting a registry.
    pub fn verify_detached(
        &self,
        packet: &VerificationPacket,
        minutes: &[u8],
        transcript: Option<&[u8]>,
    ) -> VerificationResult {
        let anchor = self.anchor_skipped(SkipReason::LocalOnly);
        self.run(packet, minutes, transcript, anchor)
    }

    /// Verify the packet's embedded minutes, including the anchor layer.
    pub async fn verify(&self, packet: &VerificationPacket) -> VerificationResult {
        self.verify_with(packet, &packet.minutes_bytes(), None).await
    }

    /// [`verify_detached`](Self::verify_detached) plus the anchor layer.
    pub async fn verify_with(
        &self,
        packet: &VerificationPacket,
        minutes: &[u8],
        transcript: Option<&[u8]>,
    ) -> VerificationResult {
        let anchor = self.check_anchor(packet).await;
        self.run(packet, minutes, transcript, anchor)
    }

    fn run(
        &self,
        packet: &VerificationPacket,
        minutes: &[u8],
        transcript: Option<&[u8]>,
        anchor: LayerReport,
    ) -> VerificationResult {
        let digests = digest_all(minutes);

        let result = VerificationResult::new(
            LayerReport::from_check(check_hash(packet, &digests), true),
            LayerReport::from_check(check_signature(packet), true),
            LayerReport::from_check(check_proof(packet, minutes), true),
            self.check_storage(packet),
            check_transcript(packet, transcript),
            anchor,
        );

        for (layer, failure) in result.failures() {
            warn!(layer, %failure, "verification layer failed");
        }
        info!(
            minutes_sha256 = %packet.credential().sha256,
            valid = result.valid,
            "packet verified"
        );
        result
    }

    fn anchor_skipped(&self, reason: SkipReason) -> LayerReport {
        LayerReport::new(LayerOutcome::Skipped(reason), self.options.anchor_mandatory)
    }

    fn check_storage(&self, packet: &VerificationPacket) -> LayerReport {
        let mandatory = self.options.require_cas;
        let Some(store) = &self.store else {
            return LayerReport::new(LayerOutcome::Skipped(SkipReason::NoStore), mandatory);
        };

        let transcript = packet.transcript();
        let blobs = [
            packet.credential().digests(),
            DigestPair {
                sha256: transcript.sha256,
                blake3: transcript.blake3,
            },
        ];

        for pair in blobs {
            for algorithm in HashAlgorithm::ALL {
                let digest = pair.get(algorithm);
                let failure = match store.get(&digest) {
                    Ok(_) => continue,
                    Err(StoreError::NotFound(_)) => {
                        VerificationFailure::BlobMissing(digest.cas_path())
                    }
                    Err(StoreError::Corrupted { .. }) => {
                        VerificationFailure::BlobCorrupted(digest.cas_path())
                    }
                    Err(e) => {
                        VerificationFailure::BlobMissing(format!("{}: {}", digest.cas_path(), e))
                    }
                };
                return LayerReport::new(LayerOutcome::Failed(failure), mandatory);
            }
        }
        LayerReport::new(LayerOutcome::Passed, mandatory)
    }

    async fn check_anchor(&self, packet: &VerificationPacket) -> LayerReport {
        let mandatory = self.options.anchor_mandatory;
        let Some(client) = &self.anchor else {
            return self.anchor_skipped(SkipReason::AnchoringDisabled);
        };

        let merkle_root = packet.proof().merkle_root;
        let doc_hash = packet.credential().sha256;

        match packet.anchor() {
            None if !mandatory => return self.anchor_skipped(SkipReason::NotAnchored),
            None => {}
            Some(receipt) if receipt.merkle_root != merkle_root || receipt.doc_hash != doc_hash => {
                let failure = VerificationFailure::AnchorMismatch(
                    "receipt does not reference this packet".into(),
                );
                return LayerReport::new(LayerOutcome::Failed(failure), mandatory);
            }
            Some(_) => {}
        }

        let outcome = match client.lookup(&merkle_root).await {
            Ok(Some(record)) if record.doc_hash == doc_hash => {
                debug!(root = %merkle_root, submitter = %record.submitter, "anchor confirmed");
                LayerOutcome::Passed
            }
            Ok(Some(record)) => LayerOutcome::Failed(VerificationFailure::AnchorMismatch(format!(
                "registry holds document {} for root {}",
                record.doc_hash, merkle_root
            ))),
            Ok(None) => LayerOutcome::Failed(VerificationFailure::AnchorUnavailable(format!(
                "no anchor recorded for root {}",
                merkle_root
            ))),
            Err(e) => LayerOutcome::Failed(VerificationFailure::AnchorUnavailable(e.to_string())),
        };
        LayerReport::new(outcome, mandatory)
    }
}

fn check_hash(
    packet: &VerificationPacket,
    digests: &DigestPair,
) -> Result<(), VerificationFailure> {
    let claimed = packet.credential().digests();
    for algorithm in HashAlgorithm::ALL {
        let (expected, actual) = (claimed.get(algorithm), digests.get(algorithm));
        if expected != actual {
            return Err(VerificationFailure::HashMismatch {
                algorithm,
                expected: expected.to_hex(),
                actual: actual.to_hex(),
            });
        }
    }
    if packet.hash_stamp().minutes_sha256 != digests.sha256 {
        return Err(VerificationFailure::HashMismatch {
            algorithm: HashAlgorithm::Sha256,
            expected: packet.hash_stamp().minutes_sha256.to_hex(),
            actual: digests.sha256.to_hex(),
        });
    }
    Ok(())
}

fn check_signature(packet: &VerificationPacket) -> Result<(), VerificationFailure> {
    if packet.credential().verify_signature() {
        Ok(())
    } else {
        Err(VerificationFailure::SignatureInvalid)
    }
}

fn check_proof(
    packet: &VerificationPacket,
    minutes: &[u8],
) -> Result<(), VerificationFailure> {
    let proof = packet.proof();
    let index = proof.inclusion.index;

    if packet.hash_stamp().merkle_root != proof.merkle_root {
        return Err(VerificationFailure::ProofInvalid(
            "hash stamp and proof disagree on the Merkle root".into(),
        ));
    }

    let Some(leaf) = chunk_leaf(minutes, index) else {
        return Err(VerificationFailure::ProofInvalid(format!(
            "leaf {} does not exist in the minutes",
            index
        )));
    };
    if proof.leaves.get(index) != Some(&leaf) {
        return Err(VerificationFailure::ProofInvalid(format!(
            "leaf {} does not match the published leaf",
            index
        )));
    }

    let check = verify_inclusion(&leaf, &proof.inclusion, &proof.merkle_root);
    if !check.valid {
        return Err(VerificationFailure::ProofInvalid(format!(
            "inclusion path leads to {}, not {}",
            check.computed_root, proof.merkle_root
        )));
    }

    let rebuilt = MerkleTree::build(minutes);
    if rebuilt.root() != proof.merkle_root || rebuilt.leaves() != proof.leaves.as_slice() {
        return Err(VerificationFailure::ProofInvalid(format!(
            "rebuilt tree has root {}, packet claims {}",
            rebuilt.root(),
            proof.merkle_root
        )));
    }
    Ok(())
}

fn check_transcript(packet: &VerificationPacket, transcript: Option<&[u8]>) -> LayerReport {
    let Some(bytes) = transcript else {
        return LayerReport::new(LayerOutcome::Skipped(SkipReason::NoTranscript), false);
    };

    let reference = packet.transcript();
    let digests = digest_all(bytes);
    let check = if digests.sha256 != reference.sha256 || digests.blake3 != reference.blake3 {
        Err(VerificationFailure::TranscriptMismatch(format!(
            "{} hashes to {}, reference is {}",
            reference.name, digests.sha256, reference.sha256
        )))
    } else if bytes.len() as u64 != reference.size {
        Err(VerificationFailure::TranscriptMismatch(format!(
            "{} is {} bytes, reference says {}",
            reference.name,
            bytes.len(),
            reference.size
        )))
    } else if packet.hash_stamp().transcript_sha256 != reference.sha256 {
        Err(VerificationFailure::TranscriptMismatch(
            "hash stamp disagrees with transcript reference".into(),
        ))
    } else {
        Ok(())
    };
    LayerReport::from_check(check, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use veriminutes_core::{
        canonical_json, Credential, Keypair, MerkleProof, PacketAssembler, TranscriptRef,
    };
    use veriminutes_store::MemoryStore;

    const TRANSCRIPT: &[u8] = b"Alice: call to order\nBob: second";

    fn packet_for(minutes: &[u8], keypair: &Keypair) -> VerificationPacket {
        let credential = Credential::issue(keypair, digest_all(minutes), minutes.len() as u64);
        let proof = MerkleProof::from_tree(&MerkleTree::build(minutes), 0).unwrap();
        PacketAssembler::new(minutes.to_vec())
            .transcript(TranscriptRef::for_bytes("transcript.json", TRANSCRIPT))
            .credential(credential)
            .proof(proof)
            .assemble()
            .unwrap()
            .packet
    }

    fn minutes() -> Vec<u8> {
        canonical_json(&json!({"title": "Q3 Board", "motions": ["approve budget"]}))
    }

    #[test]
    fn test_valid_packet_passes_local() {
        let packet = packet_for(&minutes(), &Keypair::generate());
        let result = VerificationPipeline::new().verify_local(&packet);
        assert!(result.valid, "{}", result);
        assert!(result.hash.passed() && result.signature.passed() && result.proof.passed());
        assert_eq!(result.storage.outcome, LayerOutcome::Skipped(SkipReason::NoStore));
        assert_eq!(result.anchor.outcome, LayerOutcome::Skipped(SkipReason::LocalOnly));
        assert!(!result.anchor.mandatory);
    }

    #[test]
    fn test_mutated_minutes_fail_hash_and_proof() {
        let original = minutes();
        let packet = packet_for(&original, &Keypair::generate());
        let mut mutated = original.clone();
        mutated[5] ^= 0x01;

        let result = VerificationPipeline::new().verify_detached(&packet, &mutated, None);
        assert!(!result.valid);
        assert!(matches!(
            result.hash.failure(),
            Some(VerificationFailure::HashMismatch { .. })
        ));
        assert!(matches!(
            result.proof.failure(),
            Some(VerificationFailure::ProofInvalid(_))
        ));
        assert!(result.signature.passed());
    }

    #[test]
    fn test_transcript_layer() {
        let packet = packet_for(&minutes(), &Keypair::generate());
        let pipeline = VerificationPipeline::new();

        let ok = pipeline.verify_detached(&packet, &minutes(), Some(TRANSCRIPT));
        assert!(ok.valid);
        assert!(ok.transcript.passed() && ok.transcript.mandatory);

        let bad = pipeline.verify_detached(&packet, &minutes(), Some(b"Alice: adjourned"));
        assert!(!bad.valid);
        assert!(matches!(
            bad.transcript.failure(),
            Some(VerificationFailure::TranscriptMismatch(_))
        ));
    }

    #[test]
    fn test_storage_layer_reports_missing_and_corrupted() {
        let minutes = minutes();
        let packet = packet_for(&minutes, &Keypair::generate());
        let store = Arc::new(MemoryStore::new());
        let pipeline = VerificationPipeline::new()
            .with_store(store.clone())
            .with_options(VerifyOptions {
                require_cas: true,
                ..VerifyOptions::default()
            });

        let missing = pipeline.verify_local(&packet);
        assert!(!missing.valid);
        assert!(matches!(
            missing.storage.failure(),
            Some(VerificationFailure::BlobMissing(_))
        ));

        let pair = store.put_all(&minutes).unwrap();
        store.put_all(TRANSCRIPT).unwrap();
        assert!(pipeline.verify_local(&packet).valid);

        store
            .overwrite_unchecked(pair.get(HashAlgorithm::Blake3), &b"tampered"[..])
            .unwrap();
        let corrupted = pipeline.verify_local(&packet);
        assert!(!corrupted.valid);
        assert!(matches!(
            corrupted.storage.failure(),
            Some(VerificationFailure::BlobCorrupted(_))
        ));
    }

    #[test]
    fn test_storage_failure_advisory_without_require_cas() {
        let packet = packet_for(&minutes(), &Keypair::generate());
        let result = VerificationPipeline::new()
            .with_store(Arc::new(MemoryStore::new()))
            .verify_local(&packet);
        assert!(result.valid);
        assert!(result.storage.failure().is_some());
        assert!(!result.storage.mandatory);
    }

    #[test]
    fn test_report_serializes_itemized() {
        let packet = packet_for(&minutes(), &Keypair::generate());
        let result = VerificationPipeline::new().verify_local(&packet);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["hash"]["outcome"]["status"], "passed");
        assert_eq!(json["anchor"]["outcome"]["status"], "skipped");
        assert_eq!(json["anchor"]["outcome"]["detail"], "local_only");
    }
}
