//! Service configuration

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strongroom_core::WalletId;
use strongroom_storage::{AesGcmCipher, KdfParams};

/// Environment variable overriding the application data directory
pub const DATA_DIR_ENV: &str = "STRONGROOM_DATA_DIR";

/// Payments service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Root directory holding one directory per wallet
    pub application_data_dir: PathBuf,
    /// Argon2id parameters for wallet files
    pub kdf: KdfParams,
    /// Buffer of the transaction-seen channel
    pub seen_channel_capacity: usize,
    /// Pending credential rotation requests
    pub rotation_queue_capacity: usize,
    /// Buffer of the rotation outcome broadcast
    pub outcome_channel_capacity: usize,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            application_data_dir: default_application_data_dir(),
            kdf: KdfParams::default(),
            seen_channel_capacity: 100,
            rotation_queue_capacity: 4,
            outcome_channel_capacity: 16,
        }
    }
}

impl PaymentsConfig {
    /// Parse a JSON document; absent fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Apply environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            self.application_data_dir = PathBuf::from(dir);
        }
        self
    }

    /// Directory of one wallet
    pub fn wallet_directory(&self, wallet_id: &WalletId) -> PathBuf {
        self.application_data_dir.join(wallet_id.wallet_root())
    }

    /// Root data directory
    pub fn application_data_dir(&self) -> &Path {
        &self.application_data_dir
    }

    /// Cipher for wallet files under the configured KDF parameters
    pub fn cipher(&self) -> AesGcmCipher {
        AesGcmCipher::new(self.kdf)
    }
}

fn default_application_data_dir() -> PathBuf {
    ProjectDirs::from("org", "Strongroom", "Strongroom")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./strongroom"))
}
