//! Encrypted backing files
//!
//! A backing file holds exactly one sealed container. Writes go to a
//! temporary file in the target directory which is synced and renamed over
//! the target, so readers see either the old or the new contents.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::security::{KeyCipher, WalletKey};
use crate::{Error, Result};

/// Replace `path` with `bytes` atomically
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Read a whole file, mapping absence to [`Error::Missing`]
pub fn read_existing(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::Missing(path.to_path_buf()))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Sealed file store over a [`KeyCipher`]
#[derive(Clone)]
pub struct EncryptedFileStore {
    cipher: Arc<dyn KeyCipher>,
}

impl EncryptedFileStore {
    /// Store using the given cipher
    pub fn new(cipher: Arc<dyn KeyCipher>) -> Self {
        Self { cipher }
    }

    /// Cipher in use
    pub fn cipher(&self) -> &Arc<dyn KeyCipher> {
        &self.cipher
    }

    /// Seal `plaintext` under a key derived from `credential` and write it
    pub fn save(&self, path: &Path, credential: &str, plaintext: &[u8]) -> Result<()> {
        let key = self.cipher.derive_key(credential)?;
        self.save_with_key(path, &key, plaintext)
    }

    /// Seal `plaintext` under `key` and write it
    pub fn save_with_key(&self, path: &Path, key: &WalletKey, plaintext: &[u8]) -> Result<()> {
        let sealed = self.cipher.encrypt(key, plaintext)?;
        write_atomically(path, &sealed)?;
        tracing::debug!("Wrote {} sealed bytes to {}", sealed.len(), path.display());
        Ok(())
    }

    /// Read and open the file under a key derived from `credential`
    pub fn load(&self, path: &Path, credential: &str) -> Result<Vec<u8>> {
        let sealed = read_existing(path)?;
        let key = self.cipher.derive_key(credential)?;
        let plaintext = self.cipher.decrypt(&key, &sealed)?;
        tracing::debug!("Read {} sealed bytes from {}", sealed.len(), path.display());
        Ok(plaintext)
    }
}

impl std::fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStore").finish_non_exhaustive()
    }
}
