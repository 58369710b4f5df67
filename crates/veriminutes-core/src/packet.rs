//! Verification packets: the self-contained bundle of minutes, credential,
//! Merkle proof, and timestamp.
//!
//! A packet is immutable once assembled. Fields are read through accessors;
//! any change means assembling a new packet.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{canonical_json, parse_canonical};
use crate::credential::Credential;
use crate::error::{CoreError, Result};
use crate::hash::{digest_all, Blake3Hash, HashAlgorithm, Sha256Hash};
use crate::merkle::{InclusionProof, MerkleTree, CHUNK_SIZE, LEAF_ALGORITHM};

/// Schema identifier of the packet format produced by this crate.
pub const PACKET_SCHEMA: &str = "veriminutes.packet/v1";

/// Schema identifier of session manifests.
pub const MANIFEST_SCHEMA: &str = "veriminutes.manifest/v1";

/// File name under which minutes are stored in a session.
pub const MINUTES_FILE: &str = "minutes.json";

/// UTC timestamps rendered with microsecond precision, e.g.
/// `2025-09-12T10:00:00.123456Z`.
pub mod stamp {
    use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// The current time, truncated to microseconds.
    pub fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Reference to the transcript the minutes were derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRef {
    pub name: String,
    pub sha256: Sha256Hash,
    pub blake3: Blake3Hash,
    pub size: u64,
}

impl TranscriptRef {
    /// Describe transcript bytes by name and digests.
    pub fn for_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        let digests = digest_all(bytes);
        Self {
            name: name.into(),
            sha256: digests.sha256,
            blake3: digests.blake3,
            size: bytes.len() as u64,
        }
    }
}

/// Summary of the key digests for quick display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashStamp {
    pub transcript_sha256: Sha256Hash,
    pub minutes_sha256: Sha256Hash,
    pub merkle_root: Sha256Hash,
}

/// Merkle data published in a packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    pub merkle_root: Sha256Hash,
    pub chunk_size: usize,
    pub leaf_algo: HashAlgorithm,
    pub leaves: Vec<Sha256Hash>,
    pub inclusion: InclusionProof,
}

impl MerkleProof {
    /// Publish `tree` with an inclusion proof for leaf `index`.
    pub fn from_tree(tree: &MerkleTree, index: usize) -> Result<Self> {
        Ok(Self {
            merkle_root: tree.root(),
            chunk_size: CHUNK_SIZE,
            leaf_algo: LEAF_ALGORITHM,
            leaves: tree.leaves().to_vec(),
            inclusion: tree.prove_inclusion(index)?,
        })
    }

    fn check_structure(&self) -> std::result::Result<(), String> {
        if self.chunk_size != CHUNK_SIZE {
            return Err(format!("unsupported chunk size {}", self.chunk_size));
        }
        if self.leaf_algo != LEAF_ALGORITHM {
            return Err(format!("unsupported leaf algorithm {}", self.leaf_algo));
        }
        if self.leaves.is_empty() {
            return Err("proof has no leaves".into());
        }
        if self.inclusion.index >= self.leaves.len() {
            return Err(format!(
                "inclusion index {} out of range for {} leaves",
                self.inclusion.index,
                self.leaves.len()
            ));
        }
        Ok(())
    }
}

/// Receipt returned by an anchor registry when a root was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorReceipt {
    /// Identifier of the registry that recorded the anchor.
    pub registry: String,
    /// Registry-specific transaction reference.
    pub tx_ref: String,
    /// Position of the record in the registry.
    pub sequence: u64,
    pub merkle_root: Sha256Hash,
    pub doc_hash: Sha256Hash,
    pub schema_id: String,
    pub uri: String,
    #[serde(with = "stamp")]
    pub anchored_at: DateTime<Utc>,
}

/// The persisted verification packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPacket {
    schema: String,
    minutes: Value,
    transcript: TranscriptRef,
    credential: Credential,
    proof: MerkleProof,
    #[serde(with = "stamp")]
    stamped_at: DateTime<Utc>,
    hash_stamp: HashStamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anchor: Option<AnchorReceipt>,
}

impl VerificationPacket {
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The minutes document.
    pub fn minutes(&self) -> &Value {
        &self.minutes
    }

    /// The exact bytes the credential and proof cover.
    pub fn minutes_bytes(&self) -> Vec<u8> {
        canonical_json(&self.minutes)
    }

    pub fn transcript(&self) -> &TranscriptRef {
        &self.transcript
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn proof(&self) -> &MerkleProof {
        &self.proof
    }

    pub fn stamped_at(&self) -> DateTime<Utc> {
        self.stamped_at
    }

    pub fn hash_stamp(&self) -> &HashStamp {
        &self.hash_stamp
    }

    pub fn anchor(&self) -> Option<&AnchorReceipt> {
        self.anchor.as_ref()
    }

    /// Parse and structurally validate a persisted packet.
    ///
    /// Unknown schema identifiers are rejected rather than guessed at.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let raw: Value =
            serde_json::from_slice(bytes).map_err(|e| CoreError::MalformedPacket(e.to_string()))?;

        match raw.get("schema").and_then(Value::as_str) {
            Some(PACKET_SCHEMA) => {}
            Some(other) => return Err(CoreError::UnsupportedSchema(other.to_string())),
            None => return Err(CoreError::MalformedPacket("missing schema identifier".into())),
        }

        let packet: Self =
            serde_json::from_value(raw).map_err(|e| CoreError::MalformedPacket(e.to_string()))?;
        packet
            .proof
            .check_structure()
            .map_err(CoreError::MalformedPacket)?;
        Ok(packet)
    }

    /// Pretty-printed JSON for persistence.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }
}

/// Kind of artifact listed in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Transcript,
    Minutes,
    Credential,
    Proof,
    Packet,
    AnchorReceipt,
}

/// One artifact in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub sha256: Sha256Hash,
    pub blake3: Blake3Hash,
    pub size: u64,
}

impl ManifestEntry {
    /// Describe an artifact by hashing its bytes.
    pub fn for_bytes(kind: ArtifactKind, file_name: impl Into<String>, bytes: &[u8]) -> Self {
        let digests = digest_all(bytes);
        Self {
            kind,
            file_name: file_name.into(),
            sha256: digests.sha256,
            blake3: digests.blake3,
            size: bytes.len() as u64,
        }
    }
}

/// Index of the artifacts belonging to one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema: String,
    #[serde(with = "stamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "stamp")]
    pub updated_at: DateTime<Utc>,
    pub artifacts: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            schema: MANIFEST_SCHEMA.to_string(),
            created_at: at,
            updated_at: at,
            artifacts: Vec::new(),
        }
    }

    /// Add an entry, replacing any entry with the same file name.
    pub fn record(&mut self, entry: ManifestEntry, at: DateTime<Utc>) {
        self.artifacts.retain(|e| e.file_name != entry.file_name);
        self.artifacts.push(entry);
        self.updated_at = at.trunc_subsecs(6);
    }

    /// Carry entries of `other` into this manifest, keeping the older creation time.
    pub fn merge(&mut self, other: Manifest) {
        self.created_at = self.created_at.min(other.created_at);
        for entry in other.artifacts {
            self.record(entry, other.updated_at.max(self.updated_at));
        }
    }

    pub fn find(&self, file_name: &str) -> Option<&ManifestEntry> {
        self.artifacts.iter().find(|e| e.file_name == file_name)
    }
}

/// Output of [`PacketAssembler::assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPacket {
    pub packet: VerificationPacket,
    pub manifest: Manifest,
}

/// Composes the packet from already-computed parts.
///
/// ```
/// use veriminutes_core::{
///     canonical_json, digest_all, Credential, Keypair, MerkleProof, MerkleTree,
///     PacketAssembler, TranscriptRef,
/// };
///
/// let minutes = canonical_json(&serde_json::json!({"title": "Q3 Board"}));
/// let keypair = Keypair::generate();
/// let credential = Credential::issue(&keypair, digest_all(&minutes), minutes.len() as u64);
/// let proof = MerkleProof::from_tree(&MerkleTree::build(&minutes), 0).unwrap();
///
/// let assembled = PacketAssembler::new(minutes)
///     .transcript(TranscriptRef::for_bytes("transcript.json", b"Alice: hello"))
///     .credential(credential)
///     .proof(proof)
///     .assemble()
///     .unwrap();
/// assert_eq!(assembled.manifest.artifacts.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PacketAssembler {
    minutes_bytes: Vec<u8>,
    transcript: Option<TranscriptRef>,
    credential: Option<Credential>,
    proof: Option<MerkleProof>,
    stamped_at: Option<DateTime<Utc>>,
    anchor: Option<AnchorReceipt>,
}

impl PacketAssembler {
    /// Start from the canonical minutes bytes.
    pub fn new(minutes_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            minutes_bytes: minutes_bytes.into(),
            transcript: None,
            credential: None,
            proof: None,
            stamped_at: None,
            anchor: None,
        }
    }

    pub fn transcript(mut self, transcript: TranscriptRef) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn proof(mut self, proof: MerkleProof) -> Self {
        self.proof = Some(proof);
        self
    }

    /// Set the timestamp. Defaults to now; truncated to microseconds.
    pub fn stamped_at(mut self, ts: DateTime<Utc>) -> Self {
        self.stamped_at = Some(ts);
        self
    }

    pub fn anchor(mut self, receipt: AnchorReceipt) -> Self {
        self.anchor = Some(receipt);
        self
    }

    /// Compose the packet and its manifest.
    pub fn assemble(self) -> Result<AssembledPacket> {
        let transcript = self
            .transcript
            .ok_or_else(|| CoreError::MalformedInput("missing transcript reference".into()))?;
        let credential = self
            .credential
            .ok_or_else(|| CoreError::MalformedInput("missing credential".into()))?;
        let proof = self
            .proof
            .ok_or_else(|| CoreError::MalformedInput("missing Merkle proof".into()))?;
        proof.check_structure().map_err(CoreError::MalformedInput)?;

        let minutes = parse_canonical(&self.minutes_bytes)?;
        let stamped_at = self.stamped_at.unwrap_or_else(stamp::now).trunc_subsecs(6);

        let hash_stamp = HashStamp {
            transcript_sha256: transcript.sha256,
            minutes_sha256: credential.sha256,
            merkle_root: proof.merkle_root,
        };

        let mut manifest = Manifest::new(stamped_at);
        manifest.record(
            ManifestEntry {
                kind: ArtifactKind::Transcript,
                file_name: transcript.name.clone(),
                sha256: transcript.sha256,
                blake3: transcript.blake3,
                size: transcript.size,
            },
            stamped_at,
        );
        manifest.record(
            ManifestEntry {
                kind: ArtifactKind::Minutes,
                file_name: MINUTES_FILE.to_string(),
                sha256: credential.sha256,
                blake3: credential.blake3,
                size: credential.size,
            },
            stamped_at,
        );

        let packet = VerificationPacket {
            schema: PACKET_SCHEMA.to_string(),
            minutes,
            transcript,
            credential,
            proof,
            stamped_at,
            hash_stamp,
            anchor: self.anchor,
        };

        Ok(AssembledPacket { packet, manifest })
    }
}
