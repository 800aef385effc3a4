//! Wallet summary file
//!
//! `<wallet-directory>/wallet-summary.json` holds the wallet's display data
//! together with two wrapped secrets: the backup key sealed under the
//! credential key, and the padded credential sealed under the backup key.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strongroom_core::WalletId;
use zeroize::Zeroizing;

use crate::encrypted_file::{read_existing, write_atomically};
use crate::security::{pad_credential_bytes, unpad_credential_bytes, KeyCipher, WalletKey};
use crate::{Error, Result};

/// Summary file name
pub const SUMMARY_FILE_NAME: &str = "wallet-summary.json";

/// Path of the summary file in a wallet directory
pub fn summary_path(wallet_directory: &Path) -> PathBuf {
    wallet_directory.join(SUMMARY_FILE_NAME)
}

/// Persisted wallet summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    /// Wallet identifier
    pub wallet_id: WalletId,
    /// Display name
    pub name: String,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
    /// Backup key sealed under the credential key
    #[serde(with = "hex::serde")]
    pub encrypted_backup_key: Vec<u8>,
    /// Padded credential sealed under the backup key
    #[serde(with = "hex::serde")]
    pub encrypted_password: Vec<u8>,
}

impl WalletSummary {
    /// New summary with a fresh backup key wrapped under `credential`.
    ///
    /// Returns the summary and the plaintext backup key.
    pub fn create(
        wallet_id: WalletId,
        name: impl Into<String>,
        credential: &str,
        cipher: &dyn KeyCipher,
    ) -> Result<(Self, WalletKey)> {
        let credential_key = cipher.derive_key(credential)?;
        let backup_key = WalletKey::generate();

        let encrypted_backup_key = cipher.encrypt(&credential_key, backup_key.as_bytes())?;
        let padded = pad_credential_bytes(credential.as_bytes());
        let encrypted_password = cipher.encrypt(&backup_key, &padded)?;

        let summary = Self {
            wallet_id,
            name: name.into(),
            notes: String::new(),
            encrypted_backup_key,
            encrypted_password,
        };
        Ok((summary, backup_key))
    }

    /// Unwrap the backup key with an already derived credential key
    pub fn backup_key(&self, cipher: &dyn KeyCipher, credential_key: &WalletKey) -> Result<WalletKey> {
        let bytes = Zeroizing::new(cipher.decrypt(credential_key, &self.encrypted_backup_key)?);
        WalletKey::from_bytes(&bytes)
    }

    /// Recover the credential from the wrapped copy
    pub fn credential(&self, cipher: &dyn KeyCipher, backup_key: &WalletKey) -> Result<Zeroizing<String>> {
        let padded = Zeroizing::new(cipher.decrypt(backup_key, &self.encrypted_password)?);
        let bytes = unpad_credential_bytes(&padded)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| Error::Malformed(format!("Credential is not UTF-8: {}", e)))?;
        Ok(Zeroizing::new(text.to_string()))
    }

    /// Read a summary file
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = read_existing(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write the summary atomically
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomically(path, &bytes)?;
        tracing::debug!("Wrote wallet summary for {} to {}", self.wallet_id, path.display());
        Ok(())
    }
}
