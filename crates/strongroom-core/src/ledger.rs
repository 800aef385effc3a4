//! Ledger collaborator interfaces
//!
//! The wallet runtime (key management, confidence tracking, broadcast) lives
//! outside this crate. These types describe what the payments subsystem reads
//! from it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;

/// Wallet identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletId(String);

impl WalletId {
    /// Prefix of every wallet directory name
    pub const WALLET_ROOT_PREFIX: &'static str = "strongroom-";

    /// Wrap an identifier string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the directory holding this wallet's files
    pub fn wallet_root(&self) -> String {
        format!("{}{}", Self::WALLET_ROOT_PREFIX, self.0)
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ledger's belief state about a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Included in a block
    Confirmed,
    /// Known but not yet in a block
    Pending,
    /// Conflicted or double spent
    Dead,
    /// The ledger has no opinion
    Unknown,
}

/// Confidence snapshot for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confidence {
    /// Classification
    pub classification: Classification,
    /// Blocks since first confirmation (meaningful only when confirmed)
    pub depth: u32,
    /// Number of peers that relayed the transaction
    pub broadcast_peers: u32,
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Value in base units
    pub value: u64,
    /// Locking script
    pub script_pubkey: Vec<u8>,
}

/// Raw transaction record as delivered by the ledger
#[derive(Debug, Clone)]
pub struct LedgerTransaction {
    /// Transaction hash (hex)
    pub hash: String,
    /// Last time the ledger updated this transaction
    pub update_time: DateTime<Utc>,
    /// Confidence, if the ledger tracks one
    pub confidence: Option<Confidence>,
    /// Outputs in transaction order
    pub outputs: Vec<TxOutput>,
    /// Whether this is a coinbase transaction
    pub is_coinbase: bool,
    /// Serialized transaction bytes
    pub raw: Vec<u8>,
}

/// Read side of the open wallet
pub trait WalletView: Send + Sync {
    /// All transactions known to the wallet, including dead ones
    fn transactions(&self) -> Vec<LedgerTransaction>;

    /// Net signed value of a transaction relative to this wallet
    fn value_of(&self, transaction: &LedgerTransaction) -> i64;

    /// Whether an output pays this wallet
    fn is_mine(&self, output: &TxOutput) -> bool;
}

/// Credential primitives of the open wallet
pub trait WalletCredentials: Send + Sync {
    /// Check an unlock credential against the wallet
    fn check_password(&self, password: &str) -> bool;

    /// Remove the wallet's own key encryption
    fn decrypt(&self, password: &str) -> Result<()>;

    /// Encrypt the wallet's keys under a credential
    fn encrypt(&self, password: &str) -> Result<()>;
}

/// A wallet that can be both read and re-keyed
pub trait LedgerWallet: WalletView + WalletCredentials {}

impl<T: WalletView + WalletCredentials> LedgerWallet for T {}

/// Address-from-script resolution
pub trait AddressResolver: Send + Sync {
    /// Resolve the destination address of a locking script
    fn address_from_script(&self, script: &[u8]) -> Result<String>;
}

/// Exchange rate event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRate {
    /// Exchange that published the rate (e.g. "Bitstamp")
    pub exchange_name: String,
    /// Local currency units per whole coin
    pub rate: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
}

/// Source of the latest exchange rate
pub trait ExchangeRateSource: Send + Sync {
    /// Latest exchange rate event, if any has been seen
    fn latest_rate(&self) -> Option<ExchangeRate>;
}

/// Rate source that never has a rate
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExchangeRate;

impl ExchangeRateSource for NoExchangeRate {
    fn latest_rate(&self) -> Option<ExchangeRate> {
        None
    }
}
