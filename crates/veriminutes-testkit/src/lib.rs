//! # VeriMinutes Testkit
//!
//! Testing utilities for VeriMinutes.
//!
//! ## Overview
//!
//! - **Golden vectors**: Known digests and tree shapes for cross-implementation checks
//! - **Generators**: Proptest strategies for minutes documents and mutations
//! - **Fixtures**: Keypair + in-memory CAS, or a notary over a temporary directory
//!
//! ## Golden Vectors
//!
//! ```rust
//! use veriminutes_testkit::vectors::verify_all_vectors;
//!
//! for (name, passed, detail) in verify_all_vectors() {
//!     assert!(passed, "{}: {}", name, detail);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use veriminutes::VerificationPipeline;
//! use veriminutes_testkit::{generators::minutes, TestFixture};
//!
//! proptest! {
//!     #[test]
//!     fn packets_verify(doc in minutes(4096)) {
//!         let packet = TestFixture::new().packet(&doc);
//!         prop_assert!(VerificationPipeline::new().verify_local(&packet).valid);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    multi_signer_fixtures, notarize_session, random_bytes, sample_minutes, sample_transcript,
    seeded_notary, session_config, SessionFixture, TestFixture, TRANSCRIPT_NAME,
};
pub use vectors::{digest_vectors, tree_vectors, verify_all_vectors, DigestVector, TreeVector};
