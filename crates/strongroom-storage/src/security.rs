//! Key derivation and authenticated encryption
//!
//! Credentials are stretched with Argon2id into 256-bit keys which seal data
//! with AES-256-GCM. The container layout is
//! `[version(1)][algorithm(1)][nonce(12)][ciphertext]`.
//!
//! Wallet files use a process-wide salt and IV ([`WALLET_KDF_SALT`],
//! [`WALLET_AES_IV`]) so that existing files stay readable. The nonce is
//! still carried in every container, so readers never depend on it.

use crate::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{Argon2, ParamsBuilder, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Container version written by this crate
pub const CONTAINER_VERSION: u8 = 1;

/// Algorithm tag for AES-256-GCM
pub const ALGORITHM_AES_GCM: u8 = 0;

/// Header length: version, algorithm and nonce
pub const CONTAINER_HEADER_LEN: usize = 2 + NONCE_LEN;

/// AES-GCM nonce length
pub const NONCE_LEN: usize = 12;

/// Block size used when padding credentials
pub const CREDENTIAL_BLOCK_LEN: usize = 32;

/// Fixed KDF salt shared by every wallet file
pub const WALLET_KDF_SALT: [u8; 16] = [
    0x35, 0x51, 0x03, 0x80, 0x75, 0xa3, 0xb0, 0xc5, 0x2f, 0x9e, 0x47, 0x11, 0xd4, 0x6b, 0x8a, 0x27,
];

/// Fixed IV shared by every wallet file
pub const WALLET_AES_IV: [u8; NONCE_LEN] = [
    0xa3, 0x44, 0x39, 0x1f, 0x53, 0x83, 0x11, 0xb3, 0x29, 0x54, 0x86, 0x16,
];

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Iterations
    pub iterations: u32,
    /// Lanes
    pub parallelism: u32,
}

impl KdfParams {
    /// Explicit parameters
    pub const fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }
}

impl Default for KdfParams {
    /// Memory: 64 MiB (65536 KiB), Iterations: 3, Parallelism: 4
    fn default() -> Self {
        Self::new(65536, 3, 4)
    }
}

/// 256-bit symmetric key, zeroized on drop
#[derive(Clone)]
pub struct WalletKey {
    key: Zeroizing<[u8; 32]>,
}

impl WalletKey {
    /// Generate a random key (used for backup keys)
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut *key);
        Self { key }
    }

    /// Create from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(Error::Malformed(format!(
                "Invalid key length: {}",
                bytes.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for WalletKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WalletKey(..)")
    }
}

/// Key derivation and sealing primitives used for wallet files
pub trait KeyCipher: Send + Sync {
    /// Stretch a credential into a key
    fn derive_key(&self, credential: &str) -> Result<WalletKey>;

    /// Seal plaintext into a container
    fn encrypt(&self, key: &WalletKey, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Open a container
    fn decrypt(&self, key: &WalletKey, container: &[u8]) -> Result<Vec<u8>>;
}

/// Argon2id + AES-256-GCM with the wallet-wide salt and IV
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher {
    params: KdfParams,
}

impl AesGcmCipher {
    /// Cipher with the given KDF parameters
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// KDF parameters in use
    pub fn params(&self) -> KdfParams {
        self.params
    }
}

impl KeyCipher for AesGcmCipher {
    fn derive_key(&self, credential: &str) -> Result<WalletKey> {
        let bytes = derive_key_bytes(credential, &WALLET_KDF_SALT, &self.params)?;
        WalletKey::from_bytes(&bytes[..])
    }

    fn encrypt(&self, key: &WalletKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal(key, &WALLET_AES_IV, plaintext)
    }

    fn decrypt(&self, key: &WalletKey, container: &[u8]) -> Result<Vec<u8>> {
        open(key, container)
    }
}

/// Derive raw key bytes from a credential using Argon2id.
pub fn derive_key_bytes(
    credential: &str,
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>> {
    if salt.len() < 16 {
        return Err(Error::KeyDerivation("Salt too short".to_string()));
    }

    let params = ParamsBuilder::new()
        .m_cost(params.memory_kib)
        .t_cost(params.iterations)
        .p_cost(params.parallelism)
        .output_len(32)
        .build()
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(credential.as_bytes(), salt, &mut *key)
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Seal plaintext with an explicit nonce
pub fn seal(key: &WalletKey, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| Error::Encryption(e.to_string()))?;

    let mut result = Vec::with_capacity(CONTAINER_HEADER_LEN + ciphertext.len());
    result.push(CONTAINER_VERSION);
    result.push(ALGORITHM_AES_GCM);
    result.extend_from_slice(nonce);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Open a container sealed by [`seal`]
pub fn open(key: &WalletKey, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < CONTAINER_HEADER_LEN {
        return Err(Error::Malformed("Container too short".to_string()));
    }

    let version = data[0];
    let algorithm = data[1];
    if version != CONTAINER_VERSION {
        return Err(Error::Malformed(format!(
            "Unsupported container version: {}",
            version
        )));
    }
    if algorithm != ALGORITHM_AES_GCM {
        return Err(Error::Malformed(format!(
            "Algorithm mismatch: expected AES-GCM (0), got {}",
            algorithm
        )));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&data[2..CONTAINER_HEADER_LEN]);
    cipher
        .decrypt(nonce, &data[CONTAINER_HEADER_LEN..])
        .map_err(|e| Error::Decryption(e.to_string()))
}

/// Pad credential bytes to a multiple of [`CREDENTIAL_BLOCK_LEN`] (PKCS#7 style)
pub fn pad_credential_bytes(credential: &[u8]) -> Zeroizing<Vec<u8>> {
    let pad = CREDENTIAL_BLOCK_LEN - credential.len() % CREDENTIAL_BLOCK_LEN;
    let mut padded = Zeroizing::new(Vec::with_capacity(credential.len() + pad));
    padded.extend_from_slice(credential);
    // pad is in 1..=32
    padded.resize(credential.len() + pad, pad as u8);
    padded
}

/// Strip padding added by [`pad_credential_bytes`]
pub fn unpad_credential_bytes(padded: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let malformed = || Error::Malformed("Invalid credential padding".to_string());

    if padded.is_empty() || padded.len() % CREDENTIAL_BLOCK_LEN != 0 {
        return Err(malformed());
    }
    let pad = usize::from(padded[padded.len() - 1]);
    if pad == 0 || pad > CREDENTIAL_BLOCK_LEN {
        return Err(malformed());
    }
    let (body, tail) = padded.split_at(padded.len() - pad);
    if tail.iter().any(|&b| usize::from(b) != pad) {
        return Err(malformed());
    }
    Ok(Zeroizing::new(body.to_vec()))
}
