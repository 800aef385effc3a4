//! Error types

use std::path::PathBuf;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backing file does not exist
    #[error("File not found: {}", .0.display())]
    Missing(PathBuf),

    /// Authenticated decryption failed (wrong key or tampered data)
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Container or payload is structurally invalid
    #[error("Malformed data: {0}")]
    Malformed(String),

    /// Encryption error
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error means the backing file is absent
    pub fn is_missing(&self) -> bool {
        matches!(self, Error::Missing(_))
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
