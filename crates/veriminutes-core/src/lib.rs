//! # VeriMinutes Core
//!
//! Pure primitives for tamper-evident minutes: dual hashing, chunked Merkle
//! trees, Ed25519 credentials, and verification packets.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`DigestPair`] - SHA-256 and BLAKE3 over the same bytes
//! - [`MerkleTree`] - 64 KiB chunked tree with [`InclusionProof`]s
//! - [`Credential`] - Signature over the 64-byte digest [`Subject`]
//! - [`VerificationPacket`] - Immutable bundle produced by [`PacketAssembler`]
//!
//! ## Canonicalization
//!
//! Minutes are hashed as canonical JSON. See [`canonical`] module.

pub mod canonical;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod packet;

pub use canonical::{canonical_json, parse_canonical, to_canonical_json};
pub use credential::{sign_subject, verify_subject, Credential, Signer, Subject};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CoreError, Result};
pub use hash::{
    digest, digest_all, Blake3Hash, Digest, DigestPair, DualHasher, HashAlgorithm, Sha256Hash,
};
pub use merkle::{
    chunk_leaf, verify_inclusion, InclusionCheck, InclusionProof, MerkleTree, ProofStep, Side,
    CHUNK_SIZE,
};
pub use packet::{
    stamp, AnchorReceipt, ArtifactKind, AssembledPacket, HashStamp, Manifest, ManifestEntry,
    MerkleProof, PacketAssembler, TranscriptRef, VerificationPacket, MINUTES_FILE, PACKET_SCHEMA,
};
