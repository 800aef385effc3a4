//! Encrypted file storage for Strongroom wallets
//!
//! Provides the payments snapshot codec, sealed backing files and the
//! wallet summary file.
//!
//! ## Security Features
//!
//! - **Credential KDF**: Argon2id, 64 MiB memory, 3 iterations, 4 lanes by default
//! - **File Encryption**: AES-256-GCM in a versioned container
//! - **Atomic Writes**: temp file, fsync, rename
//! - **Key Zeroization**: derived and backup keys are wiped on drop

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod encrypted_file;
pub mod error;
pub mod payments_file;
pub mod security;
pub mod summary;

pub use codec::{decode, encode, Snapshot, FORMAT_VERSION};
pub use encrypted_file::{write_atomically, EncryptedFileStore};
pub use error::{Error, Result};
pub use payments_file::PaymentsFile;
pub use security::{
    pad_credential_bytes, unpad_credential_bytes, AesGcmCipher, KdfParams, KeyCipher, WalletKey,
    WALLET_AES_IV, WALLET_KDF_SALT,
};
pub use summary::{summary_path, WalletSummary};
