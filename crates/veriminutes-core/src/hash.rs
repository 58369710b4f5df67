//! Dual hashing: SHA-256 and BLAKE3 over the same byte sequence.
//!
//! SHA-256 is the primary algorithm (Merkle leaves, CAS paths, hash stamps);
//! BLAKE3 is carried alongside it in every credential.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Length in bytes of every digest produced by this module.
pub const DIGEST_LEN: usize = 32;

/// A supported hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlgorithm {
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// All algorithms, in subject order.
    pub const ALL: [HashAlgorithm; 2] = [HashAlgorithm::Sha256, HashAlgorithm::Blake3];

    /// Lowercase tag used in CAS paths and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(CoreError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl Serialize for HashAlgorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HashAlgorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn decode_hex32(s: &str) -> Result<[u8; DIGEST_LEN]> {
    let bytes = hex::decode(s).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        CoreError::DecodingError(format!("expected {} bytes, got {}", DIGEST_LEN, b.len()))
    })
}

macro_rules! digest_newtype {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; DIGEST_LEN]);

        impl $name {
            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
                &self.0
            }

            /// Convert to lowercase hex.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from hex.
            pub fn from_hex(s: &str) -> Result<Self> {
                decode_hex32(s).map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({}...)"), &self.to_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; DIGEST_LEN]> for $name {
            fn from(bytes: [u8; DIGEST_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

digest_newtype!(
    /// A 32-byte SHA-256 digest.
    Sha256Hash,
    "SHA256"
);

digest_newtype!(
    /// A 32-byte BLAKE3 digest.
    Blake3Hash,
    "Blake3"
);

impl Sha256Hash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }
}

impl Blake3Hash {
    /// Compute the BLAKE3 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }
}

/// A digest tagged with the algorithm that produced it.
///
/// This is the CAS key: `<algorithm>/<hex>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    pub algorithm: HashAlgorithm,
    pub bytes: [u8; DIGEST_LEN],
}

impl Digest {
    /// Tag raw digest bytes with an algorithm.
    pub const fn new(algorithm: HashAlgorithm, bytes: [u8; DIGEST_LEN]) -> Self {
        Self { algorithm, bytes }
    }

    /// Parse a hex digest for the given algorithm.
    pub fn from_hex(algorithm: HashAlgorithm, s: &str) -> Result<Self> {
        decode_hex32(s).map(|bytes| Self { algorithm, bytes })
    }

    /// Lowercase hex of the digest bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Relative CAS path: `<algorithm>/<hex>`.
    pub fn cas_path(&self) -> String {
        format!("{}/{}", self.algorithm, self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}:{}...)", self.algorithm, &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl From<Sha256Hash> for Digest {
    fn from(h: Sha256Hash) -> Self {
        Self::new(HashAlgorithm::Sha256, h.0)
    }
}

impl From<Blake3Hash> for Digest {
    fn from(h: Blake3Hash) -> Self {
        Self::new(HashAlgorithm::Blake3, h.0)
    }
}

/// Both digests of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DigestPair {
    pub sha256: Sha256Hash,
    pub blake3: Blake3Hash,
}

impl DigestPair {
    /// The digest for a specific algorithm.
    pub fn get(&self, algorithm: HashAlgorithm) -> Digest {
        match algorithm {
            HashAlgorithm::Sha256 => self.sha256.into(),
            HashAlgorithm::Blake3 => self.blake3.into(),
        }
    }
}

/// Compute both digests over the same bytes.
pub fn digest_all(data: &[u8]) -> DigestPair {
    DigestPair {
        sha256: Sha256Hash::hash(data),
        blake3: Blake3Hash::hash(data),
    }
}

/// Compute a single digest.
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Digest {
    match algorithm {
        HashAlgorithm::Sha256 => Sha256Hash::hash(data).into(),
        HashAlgorithm::Blake3 => Blake3Hash::hash(data).into(),
    }
}

/// Streaming form of [`digest_all`].
///
/// Feeding the same bytes in any split produces the same [`DigestPair`].
#[derive(Clone, Default)]
pub struct DualHasher {
    sha256: Sha256,
    blake3: blake3::Hasher,
    len: u64,
}

impl DualHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb more bytes.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.sha256.update(data);
        self.blake3.update(data);
        self.len += data.len() as u64;
        self
    }

    /// Number of bytes absorbed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish and return both digests.
    pub fn finalize(self) -> DigestPair {
        DigestPair {
            sha256: Sha256Hash(self.sha256.finalize().into()),
            blake3: Blake3Hash(*self.blake3.finalize().as_bytes()),
        }
    }
}

impl fmt::Debug for DualHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DualHasher({} bytes)", self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_abc_digests() {
        let pair = digest_all(b"abc");
        assert_eq!(
            pair.sha256.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            pair.blake3.to_hex(),
            "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85"
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut hasher = DualHasher::new();
        for chunk in data.chunks(7919) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.len(), data.len() as u64);
        assert_eq!(hasher.finalize(), digest_all(&data));
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_digest_cas_path() {
        let d = digest(HashAlgorithm::Sha256, b"abc");
        assert_eq!(
            d.cas_path(),
            "sha256/ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let parsed = Digest::from_hex(HashAlgorithm::Sha256, &d.to_hex()).unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn test_hash_serializes_as_hex() {
        let h = Sha256Hash::hash(b"");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(
            json,
            "\"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\""
        );
        let back: Sha256Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        assert!(Blake3Hash::from_hex("abcd").is_err());
        assert!(Blake3Hash::from_hex("zz").is_err());
    }
}
