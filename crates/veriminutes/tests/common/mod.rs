//! Shared helpers for integration tests.

#![allow(dead_code)]

use veriminutes::Notary;
use veriminutes_core::VerificationPacket;
use veriminutes_testkit::{notarize_session, sample_minutes};

pub const SLUG: &str = "2025-09-12-q3-board";

/// Notarize and persist the sample minutes under [`SLUG`].
pub async fn notarized(notary: &Notary) -> VerificationPacket {
    notarize_session(notary, SLUG, &sample_minutes()).await
}
