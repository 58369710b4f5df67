//! # VeriMinutes
//!
//! Tamper-evident meeting minutes. A [`Notary`] turns minutes into a
//! signed, Merkle-proven [`VerificationPacket`]; a [`VerificationPipeline`]
//! checks one layer at a time and reports each layer separately.
//!
//! ```no_run
//! use veriminutes::{Notary, NotaryConfig};
//!
//! # async fn run() -> veriminutes::Result<()> {
//! let notary = Notary::from_config(NotaryConfig::load("veriminutes.toml")?)?;
//! let minutes = serde_json::json!({"title": "Q3 Board", "date": "2025-09-12"});
//! let assembled = notary
//!     .notarize("2025-09-12-q3-board", &minutes, "transcript.json", b"Alice: hello")
//!     .await?;
//! notary.persist("2025-09-12-q3-board", &assembled, b"Alice: hello")?;
//!
//! let result = notary.verify_session("2025-09-12-q3-board").await?;
//! assert!(result.valid);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - [`veriminutes_core`] - hashing, Merkle trees, credentials, packets
//! - [`veriminutes_store`] - content-addressable store and session directories
//! - [`veriminutes_anchor`] - optional anchoring capability

pub mod config;
pub mod error;
pub mod keystore;
pub mod notary;
pub mod telemetry;
pub mod verify;

pub use config::{
    AnchorMode, AnchoringConfig, KeysConfig, MerkleConfig, NotaryConfig, StorageConfig,
    VerificationConfig,
};
pub use error::{NotaryError, Result};
pub use keystore::{FileKeyProvider, KeyProvider, StaticKeyProvider};
pub use notary::{Notary, ANCHOR_FILE, CREDENTIAL_FILE, PACKET_FILE, PROOF_FILE};
pub use verify::{
    LayerOutcome, LayerReport, SkipReason, VerificationFailure, VerificationPipeline,
    VerificationResult, VerifyOptions,
};

pub use veriminutes_core::{AssembledPacket, VerificationPacket};
