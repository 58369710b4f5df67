//! Property tests: round-trip soundness, mutation detection, key binding.

use proptest::prelude::*;
use serde_json::{json, Value};
use veriminutes::{VerificationFailure, VerificationPipeline};
use veriminutes_core::{Keypair, VerificationPacket};
use veriminutes_testkit::generators::{apply_mutation, keypair, minutes, mutation};
use veriminutes_testkit::{sample_minutes, TestFixture};

/// Notes may reach into a second chunk.
const MAX_NOTES: usize = 90_000;

fn packet(doc: &Value, keypair: Keypair) -> VerificationPacket {
    TestFixture::from_keypair(keypair).packet(doc)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn assembled_packet_verifies(doc in minutes(MAX_NOTES), signer in keypair()) {
        let packet = packet(&doc, signer);
        let result = VerificationPipeline::new().verify_local(&packet);
        prop_assert!(result.valid, "{}", result);

        // Survives persistence.
        let reparsed = VerificationPacket::from_json(&packet.to_json_pretty().unwrap()).unwrap();
        prop_assert!(VerificationPipeline::new().verify_local(&reparsed).valid);
    }

    #[test]
    fn single_byte_mutation_fails_hash_and_proof(doc in minutes(MAX_NOTES), change in mutation()) {
        let packet = packet(&doc, Keypair::from_seed(&[1u8; 32]));
        let mut minutes = packet.minutes_bytes();
        apply_mutation(&mut minutes, &change);

        let result = VerificationPipeline::new().verify_detached(&packet, &minutes, None);
        prop_assert!(!result.valid);
        prop_assert!(
            matches!(result.hash.failure(), Some(VerificationFailure::HashMismatch { .. })),
            "hash layer: {:?}", result.hash
        );
        prop_assert!(
            matches!(result.proof.failure(), Some(VerificationFailure::ProofInvalid(_))),
            "proof layer: {:?}", result.proof
        );
    }

    #[test]
    fn swapped_public_key_fails_signature(signer in keypair(), other in keypair()) {
        prop_assume!(signer.public_key() != other.public_key());
        let packet = packet(&sample_minutes(), signer);

        let mut json: Value = serde_json::to_value(&packet).unwrap();
        json["credential"]["signer"]["publicKey"] = json!(other.public_key().to_base64());
        let swapped = VerificationPacket::from_json(&serde_json::to_vec(&json).unwrap()).unwrap();

        let result = VerificationPipeline::new().verify_local(&swapped);
        prop_assert!(!result.valid);
        prop_assert_eq!(result.signature.failure(), Some(&VerificationFailure::SignatureInvalid));
        prop_assert!(result.hash.passed());
        prop_assert!(result.proof.passed());
    }

    #[test]
    fn verification_is_deterministic(doc in minutes(MAX_NOTES)) {
        let packet = packet(&doc, Keypair::from_seed(&[9u8; 32]));
        let pipeline = VerificationPipeline::new();
        prop_assert_eq!(pipeline.verify_local(&packet), pipeline.verify_local(&packet));
    }
}
