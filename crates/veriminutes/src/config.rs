//! Notary configuration, loaded from TOML.
//!
//! Every section is optional:
//!
//! ```toml
//! [storage]
//! output_dir = "./output"
//!
//! [keys]
//! path = "~/.veriminutes/keys/ed25519.key"
//!
//! [merkle]
//! proof_index = 0
//!
//! [anchoring]
//! enabled = false
//! mode = "advisory"
//! registry_path = "./anchors.db"
//! timeout_ms = 5000
//! max_attempts = 3
//! submitter = "veriminutes"
//!
//! [verification]
//! require_cas = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use veriminutes_anchor::AnchorPolicy;

use crate::error::{NotaryError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotaryConfig {
    pub storage: StorageConfig,
    pub keys: KeysConfig,
    pub merkle: MerkleConfig,
    pub anchoring: AnchoringConfig,
    pub verification: VerificationConfig,
}

impl NotaryConfig {
    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.anchoring.enabled && self.anchoring.timeout_ms == 0 {
            return Err(NotaryError::InvalidConfig(
                "anchoring.timeout_ms must be positive".into(),
            ));
        }
        if self.anchoring.enabled && self.anchoring.submitter.trim().is_empty() {
            return Err(NotaryError::InvalidConfig(
                "anchoring.submitter must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Root of all session directories.
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeysConfig {
    /// Ed25519 seed file. A leading `~/` expands to `$HOME`.
    pub path: PathBuf,
}

impl KeysConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.veriminutes/keys/ed25519.key"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MerkleConfig {
    /// Leaf whose inclusion proof is published in the packet.
    pub proof_index: usize,
}

/// Whether anchor failures count against the verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    #[default]
    Advisory,
    Mandatory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnchoringConfig {
    pub enabled: bool,
    pub mode: AnchorMode,
    /// SQLite ledger file.
    pub registry_path: PathBuf,
    pub timeout_ms: u64,
    /// Clamped to `1..=5`.
    pub max_attempts: u32,
    pub submitter: String,
}

impl AnchoringConfig {
    pub fn is_mandatory(&self) -> bool {
        self.enabled && self.mode == AnchorMode::Mandatory
    }

    pub fn policy(&self) -> AnchorPolicy {
        AnchorPolicy::new(Duration::from_millis(self.timeout_ms), self.max_attempts)
    }

    pub fn resolved_registry_path(&self) -> PathBuf {
        expand_home(&self.registry_path)
    }
}

impl Default for AnchoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: AnchorMode::Advisory,
            registry_path: PathBuf::from("./anchors.db"),
            timeout_ms: 5000,
            max_attempts: 3,
            submitter: "veriminutes".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerificationConfig {
    /// Make the CAS cross-check a mandatory layer.
    pub require_cas: bool,
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
