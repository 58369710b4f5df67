//! The build path: minutes in, signed and proven packet out.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use veriminutes_anchor::{AnchorClient, AnchorRequest, SqliteAnchorRegistry};
use veriminutes_core::{
    canonical_json, digest_all, ArtifactKind, AssembledPacket, CoreError, Credential,
    MerkleProof, MerkleTree, PacketAssembler, TranscriptRef, VerificationPacket, MINUTES_FILE,
    PACKET_SCHEMA,
};
use veriminutes_store::{BlobStore, SessionStore, StoreError, MANIFEST_FILE};

use crate::config::NotaryConfig;
use crate::error::Result;
use crate::keystore::{FileKeyProvider, KeyProvider};
use crate::verify::{VerificationPipeline, VerificationResult, VerifyOptions};

pub const CREDENTIAL_FILE: &str = "minutes.cred.json";
pub const PROOF_FILE: &str = "minutes.proof.json";
pub const PACKET_FILE: &str = "minutes.packet.json";
pub const ANCHOR_FILE: &str = "minutes.anchor.json";

/// File names the notary writes itself; a transcript may not take one.
const RESERVED_FILES: [&str; 6] = [
    MINUTES_FILE,
    MANIFEST_FILE,
    CREDENTIAL_FILE,
    PROOF_FILE,
    PACKET_FILE,
    ANCHOR_FILE,
];

/// Builds, persists and re-verifies packets for meeting sessions.
pub struct Notary {
    config: NotaryConfig,
    keys: Arc<dyn KeyProvider>,
    sessions: SessionStore,
    anchor: Option<AnchorClient>,
}

impl std::fmt::Debug for Notary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notary")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("anchor", &self.anchor)
            .finish()
    }
}

impl Notary {
    /// Open the session store and, if enabled, the SQLite anchor ledger.
    pub fn new(config: NotaryConfig, keys: Arc<dyn KeyProvider>) -> Result<Self> {
        let sessions = SessionStore::open(&config.storage.output_dir)?;
        let anchor = if config.anchoring.enabled {
            let registry = SqliteAnchorRegistry::open(
                config.anchoring.resolved_registry_path(),
                config.anchoring.submitter.clone(),
            )?;
            Some(AnchorClient::new(Arc::new(registry), config.anchoring.policy()))
        } else {
            None
        };

        Ok(Self {
            config,
            keys,
            sessions,
            anchor,
        })
    }

    /// Use the seed file named in the configuration.
    pub fn from_config(config: NotaryConfig) -> Result<Self> {
        let keys = Arc::new(FileKeyProvider::new(config.keys.resolved_path()));
        Self::new(config, keys)
    }

    /// Replace the anchor client, enabling anchoring regardless of configuration.
    pub fn with_anchor_client(mut self, client: AnchorClient) -> Self {
        self.anchor = Some(client);
        self
    }

    pub fn config(&self) -> &NotaryConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Sign, prove, store and optionally anchor one set of minutes.
    ///
    /// Minutes are canonicalized before hashing. Both documents land in the
    /// session CAS under both algorithms. An anchoring failure is logged and
    /// the packet is built without a receipt, unless anchoring is mandatory.
    pub async fn notarize(
        &self,
        slug: &str,
        minutes: &Value,
        transcript_name: &str,
        transcript_bytes: &[u8],
    ) -> Result<AssembledPacket> {
        check_transcript_name(transcript_name)?;
        let minutes_bytes = canonical_json(minutes);
        let digests = digest_all(&minutes_bytes);

        let keypair = self.keys.keypair()?;
        let credential = Credential::issue(&keypair, digests, minutes_bytes.len() as u64);

        let tree = MerkleTree::build_parallel(&minutes_bytes, workers());
        let proof = MerkleProof::from_tree(&tree, self.config.merkle.proof_index)?;

        let cas = self.sessions.cas(slug)?;
        cas.put_all(&minutes_bytes)?;
        cas.put_all(transcript_bytes)?;

        let mut assembler = PacketAssembler::new(minutes_bytes)
            .transcript(TranscriptRef::for_bytes(transcript_name, transcript_bytes))
            .credential(credential)
            .proof(proof);

        if let Some(client) = &self.anchor {
            let request = AnchorRequest {
                merkle_root: tree.root(),
                doc_hash: digests.sha256,
                schema_id: PACKET_SCHEMA.to_string(),
                uri: format!("file://{}/{}", slug, MINUTES_FILE),
            };
            match client.submit(&request).await {
                Ok(receipt) => assembler = assembler.anchor(receipt),
                Err(e) if self.config.anchoring.is_mandatory() => return Err(e.into()),
                Err(e) => warn!(slug, error = %e, "anchoring failed; packet built without receipt"),
            }
        }

        let assembled = assembler.assemble()?;
        info!(
            slug,
            minutes_sha256 = %digests.sha256,
            merkle_root = %tree.root(),
            leaves = tree.leaf_count(),
            anchored = assembled.packet.anchor().is_some(),
            "packet built"
        );
        Ok(assembled)
    }

    /// Write the packet and its parts into the session directory.
    ///
    /// Returns the path of the packet file.
    pub fn persist(
        &self,
        slug: &str,
        assembled: &AssembledPacket,
        transcript_bytes: &[u8],
    ) -> Result<PathBuf> {
        let packet = &assembled.packet;
        check_transcript_name(&packet.transcript().name)?;

        self.sessions.store_artifact(
            slug,
            ArtifactKind::Transcript,
            &packet.transcript().name,
            transcript_bytes,
        )?;
        self.sessions.store_artifact(
            slug,
            ArtifactKind::Minutes,
            MINUTES_FILE,
            &packet.minutes_bytes(),
        )?;
        self.sessions.store_artifact(
            slug,
            ArtifactKind::Credential,
            CREDENTIAL_FILE,
            &serde_json::to_vec_pretty(packet.credential())?,
        )?;
        self.sessions.store_artifact(
            slug,
            ArtifactKind::Proof,
            PROOF_FILE,
            &serde_json::to_vec_pretty(packet.proof())?,
        )?;
        if let Some(receipt) = packet.anchor() {
            self.sessions.store_artifact(
                slug,
                ArtifactKind::AnchorReceipt,
                ANCHOR_FILE,
                &serde_json::to_vec_pretty(receipt)?,
            )?;
        }
        let path = self.sessions.store_artifact(
            slug,
            ArtifactKind::Packet,
            PACKET_FILE,
            &packet.to_json_pretty()?,
        )?;
        self.sessions.merge_manifest(slug, assembled.manifest.clone())?;

        info!(slug, path = %path.display(), "packet persisted");
        Ok(path)
    }

    /// Load a session's packet.
    pub fn load_packet(&self, slug: &str) -> Result<VerificationPacket> {
        let bytes = self.sessions.read_artifact(slug, PACKET_FILE)?;
        Ok(VerificationPacket::from_json(&bytes)?)
    }

    /// A pipeline configured like this notary, cross-checking against the
    /// session CAS.
    pub fn pipeline(&self, slug: &str) -> Result<VerificationPipeline> {
        let options = VerifyOptions {
            require_cas: self.config.verification.require_cas,
            anchor_mandatory: self.config.anchoring.is_mandatory(),
        };
        let store: Arc<dyn BlobStore> = Arc::new(self.sessions.cas(slug)?);
        let mut pipeline = VerificationPipeline::new()
            .with_options(options)
            .with_store(store);
        if let Some(client) = &self.anchor {
            pipeline = pipeline.with_anchor_client(client.clone());
        }
        Ok(pipeline)
    }

    /// Re-verify the minutes and transcript files on disk against the
    /// session's packet.
    pub async fn verify_session(&self, slug: &str) -> Result<VerificationResult> {
        let packet = self.load_packet(slug)?;
        let minutes = self.sessions.read_artifact(slug, MINUTES_FILE)?;
        let transcript = match self.sessions.read_artifact(slug, &packet.transcript().name) {
            Ok(bytes) => Some(bytes),
            Err(StoreError::ArtifactNotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        let result = self
            .pipeline(slug)?
            .verify_with(&packet, &minutes, transcript.as_deref())
            .await;
        info!(slug, valid = result.valid, "session verified");
        Ok(result)
    }
}

/// Transcript names must be plain file names distinct from notary artifacts.
fn check_transcript_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains(['/', '\\'])
        || name.starts_with('.')
        || RESERVED_FILES.contains(&name)
    {
        return Err(
            CoreError::MalformedInput(format!("invalid transcript name: {:?}", name)).into(),
        );
    }
    Ok(())
}

fn workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
