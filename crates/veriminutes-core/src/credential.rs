//! Credentials: an Ed25519 signature binding a document's two digests.
//!
//! The signed subject is `sha256 || blake3` (64 bytes), never the document
//! itself, so signing cost is independent of document size.

use serde::{Deserialize, Serialize};

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::hash::{Blake3Hash, DigestPair, Sha256Hash, DIGEST_LEN};

/// Signature scheme tag carried in the credential.
pub const SIGNER_TYPE: &str = "ed25519";

/// Length of the signed subject.
pub const SUBJECT_LEN: usize = 2 * DIGEST_LEN;

/// The exact bytes a credential signs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Subject([u8; SUBJECT_LEN]);

impl Subject {
    /// Concatenate the digests in fixed order: SHA-256 then BLAKE3.
    pub fn new(sha256: &Sha256Hash, blake3: &Blake3Hash) -> Self {
        let mut bytes = [0u8; SUBJECT_LEN];
        bytes[..DIGEST_LEN].copy_from_slice(sha256.as_bytes());
        bytes[DIGEST_LEN..].copy_from_slice(blake3.as_bytes());
        Self(bytes)
    }

    pub fn from_digests(digests: &DigestPair) -> Self {
        Self::new(&digests.sha256, &digests.blake3)
    }

    pub fn as_bytes(&self) -> &[u8; SUBJECT_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subject({}...)", hex::encode(&self.0[..8]))
    }
}

/// Sign a subject.
pub fn sign_subject(keypair: &Keypair, subject: &Subject) -> Ed25519Signature {
    keypair.sign(subject.as_bytes())
}

/// Check a subject signature. Any decoding or verification failure is `false`.
pub fn verify_subject(
    public_key: &Ed25519PublicKey,
    subject: &Subject,
    signature: &Ed25519Signature,
) -> bool {
    public_key.verify(subject.as_bytes(), signature).is_ok()
}

/// Identity of the signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "publicKey")]
    pub public_key: Ed25519PublicKey,
}

/// A signed statement over a document's digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub sha256: Sha256Hash,
    pub blake3: Blake3Hash,
    /// Document length in bytes. Descriptive; not part of the subject.
    pub size: u64,
    pub signer: Signer,
    pub signature: Ed25519Signature,
}

impl Credential {
    /// Sign `digests` with `keypair`.
    pub fn issue(keypair: &Keypair, digests: DigestPair, size: u64) -> Self {
        let subject = Subject::from_digests(&digests);
        Self {
            sha256: digests.sha256,
            blake3: digests.blake3,
            size,
            signer: Signer {
                kind: SIGNER_TYPE.to_string(),
                public_key: keypair.public_key(),
            },
            signature: sign_subject(keypair, &subject),
        }
    }

    pub fn digests(&self) -> DigestPair {
        DigestPair {
            sha256: self.sha256,
            blake3: self.blake3,
        }
    }

    /// Rebuild the subject from the carried digests.
    pub fn subject(&self) -> Subject {
        Subject::new(&self.sha256, &self.blake3)
    }

    /// Verify the signature against the embedded public key.
    pub fn verify_signature(&self) -> bool {
        self.signer.kind == SIGNER_TYPE
            && verify_subject(&self.signer.public_key, &self.subject(), &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::digest_all;

    #[test]
    fn test_subject_layout() {
        let digests = digest_all(b"abc");
        let subject = Subject::from_digests(&digests);
        assert_eq!(&subject.as_bytes()[..32], digests.sha256.as_bytes());
        assert_eq!(&subject.as_bytes()[32..], digests.blake3.as_bytes());
    }

    #[test]
    fn test_issue_and_verify() {
        let keypair = Keypair::from_seed(&[7u8; 32]);
        let credential = Credential::issue(&keypair, digest_all(b"minutes"), 7);
        assert!(credential.verify_signature());
        assert_eq!(credential.signer.kind, "ed25519");
    }

    #[test]
    fn test_swapped_public_key_fails() {
        let alice = Keypair::from_seed(&[1u8; 32]);
        let mallory = Keypair::from_seed(&[2u8; 32]);
        let subject = Subject::from_digests(&digest_all(b"minutes"));
        let signature = sign_subject(&alice, &subject);

        assert!(verify_subject(&alice.public_key(), &subject, &signature));
        assert!(!verify_subject(&mallory.public_key(), &subject, &signature));
    }

    #[test]
    fn test_altered_digest_fails() {
        let keypair = Keypair::generate();
        let mut credential = Credential::issue(&keypair, digest_all(b"minutes"), 7);
        credential.blake3 = digest_all(b"other").blake3;
        assert!(!credential.verify_signature());
    }

    #[test]
    fn test_credential_json_shape() {
        let keypair = Keypair::from_seed(&[9u8; 32]);
        let credential = Credential::issue(&keypair, digest_all(b"x"), 1);
        let json = serde_json::to_value(&credential).unwrap();
        assert_eq!(json["sha256"], digest_all(b"x").sha256.to_hex());
        assert_eq!(json["signer"]["type"], "ed25519");
        assert_eq!(json["signer"]["publicKey"], keypair.public_key().to_base64());
        assert!(json["signature"].is_string());

        let back: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(back, credential);
    }
}
