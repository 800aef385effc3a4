//! Open-wallet context
//!
//! Everything the payments service and the rotation engine need to know
//! about the currently open wallet, passed explicitly.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strongroom_core::{AddressResolver, ExchangeRateSource, LedgerWallet, NoExchangeRate, WalletId};
use strongroom_storage::{summary_path, WalletSummary};
use zeroize::Zeroizing;

/// Context of one open wallet
pub struct WalletContext {
    wallet: Arc<dyn LedgerWallet>,
    resolver: Arc<dyn AddressResolver>,
    rates: Arc<dyn ExchangeRateSource>,
    wallet_directory: PathBuf,
    summary: RwLock<WalletSummary>,
    credential: RwLock<Zeroizing<String>>,
}

impl WalletContext {
    /// Context for an unlocked wallet
    pub fn new(
        wallet: Arc<dyn LedgerWallet>,
        resolver: Arc<dyn AddressResolver>,
        wallet_directory: impl Into<PathBuf>,
        summary: WalletSummary,
        credential: &str,
    ) -> Self {
        Self {
            wallet,
            resolver,
            rates: Arc::new(NoExchangeRate),
            wallet_directory: wallet_directory.into(),
            summary: RwLock::new(summary),
            credential: RwLock::new(Zeroizing::new(credential.to_string())),
        }
    }

    /// Use an exchange rate source
    pub fn with_exchange_rates(mut self, rates: Arc<dyn ExchangeRateSource>) -> Self {
        self.rates = rates;
        self
    }

    /// Ledger wallet
    pub fn wallet(&self) -> &Arc<dyn LedgerWallet> {
        &self.wallet
    }

    /// Address resolver
    pub fn resolver(&self) -> &Arc<dyn AddressResolver> {
        &self.resolver
    }

    /// Exchange rate source
    pub fn rates(&self) -> &Arc<dyn ExchangeRateSource> {
        &self.rates
    }

    /// Wallet identifier
    pub fn wallet_id(&self) -> WalletId {
        self.summary.read().wallet_id.clone()
    }

    /// Directory of this wallet
    pub fn wallet_directory(&self) -> &Path {
        &self.wallet_directory
    }

    /// Location of the summary file
    pub fn summary_path(&self) -> PathBuf {
        summary_path(&self.wallet_directory)
    }

    /// Snapshot of the summary
    pub fn summary(&self) -> WalletSummary {
        self.summary.read().clone()
    }

    /// Replace the summary
    pub fn set_summary(&self, summary: WalletSummary) {
        *self.summary.write() = summary;
    }

    /// Current unlock credential
    pub fn credential(&self) -> Zeroizing<String> {
        self.credential.read().clone()
    }

    /// Replace the unlock credential
    pub fn set_credential(&self, credential: &str) {
        *self.credential.write() = Zeroizing::new(credential.to_string());
    }
}

impl std::fmt::Debug for WalletContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletContext")
            .field("wallet_id", &self.wallet_id())
            .field("wallet_directory", &self.wallet_directory)
            .finish_non_exhaustive()
    }
}
