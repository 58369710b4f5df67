//! # VeriMinutes Store
//!
//! Content-addressable storage for document bytes, plus session directories
//! holding the artifacts of one meeting.
//!
//! ## Key Types
//!
//! - [`BlobStore`] - The trait for content-addressed blob persistence
//! - [`FsStore`] - `<root>/<algorithm>/<hex>` on the filesystem
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`SessionStore`] - Per-session artifacts and `manifest.json`
//!
//! ## Design Notes
//!
//! - **Write-once**: a second put of identical content is a no-op
//! - **Atomic placement**: temp file + no-clobber rename; losing the race is success
//! - **Integrity on read**: `get` re-hashes; corruption is reported, never repaired

mod atomic;
pub mod error;
pub mod fs;
pub mod memory;
pub mod session;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use session::{slugify, SessionStore, CAS_DIR, MANIFEST_FILE};
pub use traits::{BlobStore, PutOutcome};
