//! # VeriMinutes Anchor
//!
//! Optional anchoring of Merkle roots in an external ledger.
//!
//! Anchoring is a capability, not a dependency: packets verify locally
//! without any registry. When enabled, a registry records
//! `(merkle_root, doc_hash, schema_id, uri)` and later answers lookups.
//!
//! ## Key Types
//!
//! - [`AnchorRegistry`] - Async capability trait
//! - [`SqliteAnchorRegistry`] - Local ledger emulation backed by SQLite
//! - [`MemoryAnchorRegistry`] - In-memory registry with outage simulation
//! - [`AnchorClient`] - Per-attempt timeout plus bounded retries

pub mod client;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use client::{AnchorClient, AnchorPolicy, MAX_ATTEMPTS};
pub use error::{AnchorError, Result};
pub use memory::MemoryAnchorRegistry;
pub use sqlite::SqliteAnchorRegistry;
pub use traits::{tx_ref, AnchorRecord, AnchorRegistry, AnchorRequest};
