//! Test doubles shared by the service integration tests

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use strongroom_core::{
    AddressResolver, Classification, Confidence, Error, LedgerTransaction, TxOutput,
    WalletCredentials, WalletId, WalletView,
};
use strongroom_service::{
    CredentialBoundStore, PaymentsConfig, PaymentsError, PaymentsService, WalletContext,
};
use strongroom_storage::{AesGcmCipher, KdfParams, KeyCipher, WalletKey, WalletSummary};
use tempfile::TempDir;

pub const OLD_CREDENTIAL: &str = "old credential";
pub const NEW_CREDENTIAL: &str = "new credential";

pub fn light_cipher() -> AesGcmCipher {
    AesGcmCipher::new(KdfParams::new(256, 1, 1))
}

/// Wallet owning every output whose script starts with "my"
pub struct MockWallet {
    password: Mutex<String>,
    encrypted: AtomicBool,
    transactions: Mutex<Vec<LedgerTransaction>>,
    pub credential_calls: Mutex<Vec<&'static str>>,
}

impl MockWallet {
    pub fn new(password: &str) -> Self {
        Self {
            password: Mutex::new(password.to_string()),
            encrypted: AtomicBool::new(true),
            transactions: Mutex::new(Vec::new()),
            credential_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn add_transaction(&self, transaction: LedgerTransaction) {
        self.transactions.lock().push(transaction);
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted.load(Ordering::SeqCst)
    }
}

impl WalletView for MockWallet {
    fn transactions(&self) -> Vec<LedgerTransaction> {
        self.transactions.lock().clone()
    }

    fn value_of(&self, transaction: &LedgerTransaction) -> i64 {
        let total: u64 = transaction.outputs.iter().map(|o| o.value).sum();
        if transaction.hash.starts_with("send") {
            -(total as i64)
        } else {
            transaction
                .outputs
                .iter()
                .filter(|o| self.is_mine(o))
                .map(|o| o.value as i64)
                .sum()
        }
    }

    fn is_mine(&self, output: &TxOutput) -> bool {
        output.script_pubkey.starts_with(b"my")
    }
}

impl WalletCredentials for MockWallet {
    fn check_password(&self, password: &str) -> bool {
        *self.password.lock() == password
    }

    fn decrypt(&self, password: &str) -> strongroom_core::Result<()> {
        self.credential_calls.lock().push("decrypt");
        if *self.password.lock() != password {
            return Err(Error::Wallet("wrong password".to_string()));
        }
        self.encrypted.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn encrypt(&self, password: &str) -> strongroom_core::Result<()> {
        self.credential_calls.lock().push("encrypt");
        *self.password.lock() = password.to_string();
        self.encrypted.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Scripts are the UTF-8 address
pub struct ScriptResolver;

impl AddressResolver for ScriptResolver {
    fn address_from_script(&self, script: &[u8]) -> strongroom_core::Result<String> {
        String::from_utf8(script.to_vec()).map_err(|e| Error::AddressResolution(e.to_string()))
    }
}

/// Counts key derivations; optionally corrupts the n-th encryption (1-based)
pub struct CountingCipher {
    inner: AesGcmCipher,
    pub derivations: AtomicUsize,
    encryptions: AtomicUsize,
    corrupt_encryption: Option<usize>,
}

impl CountingCipher {
    pub fn new(corrupt_encryption: Option<usize>) -> Self {
        Self {
            inner: light_cipher(),
            derivations: AtomicUsize::new(0),
            encryptions: AtomicUsize::new(0),
            corrupt_encryption,
        }
    }
}

impl KeyCipher for CountingCipher {
    fn derive_key(&self, credential: &str) -> strongroom_storage::Result<WalletKey> {
        self.derivations.fetch_add(1, Ordering::SeqCst);
        self.inner.derive_key(credential)
    }

    fn encrypt(&self, key: &WalletKey, plaintext: &[u8]) -> strongroom_storage::Result<Vec<u8>> {
        let call = self.encryptions.fetch_add(1, Ordering::SeqCst) + 1;
        let mut sealed = self.inner.encrypt(key, plaintext)?;
        if Some(call) == self.corrupt_encryption {
            let last = sealed.len() - 1;
            sealed[last] ^= 0x5a;
        }
        Ok(sealed)
    }

    fn decrypt(&self, key: &WalletKey, container: &[u8]) -> strongroom_storage::Result<Vec<u8>> {
        self.inner.decrypt(key, container)
    }
}

/// Records every credential it was rewritten under
#[derive(Default)]
pub struct RecordingStore {
    pub rewrites: Mutex<Vec<String>>,
}

impl CredentialBoundStore for RecordingStore {
    fn name(&self) -> &str {
        "contacts"
    }

    fn rewrite(&self, credential: &str) -> strongroom_service::Result<()> {
        self.rewrites.lock().push(credential.to_string());
        Ok(())
    }
}

/// Refuses every rewrite
pub struct FailingStore;

impl CredentialBoundStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    fn rewrite(&self, _credential: &str) -> strongroom_service::Result<()> {
        Err(PaymentsError::SaveFailure(strongroom_storage::Error::Io(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume"),
        )))
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: PaymentsConfig,
    pub wallet: Arc<MockWallet>,
    pub context: Arc<WalletContext>,
}

impl Fixture {
    /// Wallet directory with a summary wrapped under [`OLD_CREDENTIAL`]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = PaymentsConfig {
            application_data_dir: dir.path().to_path_buf(),
            kdf: KdfParams::new(256, 1, 1),
            ..Default::default()
        };
        let wallet_directory = config.wallet_directory(&WalletId::new("test"));
        std::fs::create_dir_all(&wallet_directory).unwrap();
        let wallet = Arc::new(MockWallet::new(OLD_CREDENTIAL));
        let (summary, _) =
            WalletSummary::create(WalletId::new("test"), "Test", OLD_CREDENTIAL, &light_cipher())
                .unwrap();
        let context = WalletContext::new(
            wallet.clone(),
            Arc::new(ScriptResolver),
            wallet_directory,
            summary.clone(),
            OLD_CREDENTIAL,
        );
        summary.write(&context.summary_path()).unwrap();

        Self {
            dir,
            config,
            wallet,
            context: Arc::new(context),
        }
    }

    pub fn payments(&self) -> Arc<PaymentsService> {
        Arc::new(PaymentsService::with_config(
            Arc::clone(&self.context),
            &self.config,
        ))
    }

    pub fn payments_directory(&self) -> PathBuf {
        self.context.wallet_directory().join("payments")
    }

    pub fn payments_path(&self) -> PathBuf {
        self.payments_directory().join("payments.aes")
    }

    pub fn summary_bytes(&self) -> Vec<u8> {
        std::fs::read(self.context.summary_path()).unwrap()
    }
}

pub fn ledger_tx(hash: &str, depth: u32, outputs: &[(&str, u64)]) -> LedgerTransaction {
    LedgerTransaction {
        hash: hash.to_string(),
        update_time: Utc.with_ymd_and_hms(2014, 7, 1, 9, 30, 0).unwrap(),
        confidence: Some(Confidence {
            classification: if depth > 0 {
                Classification::Confirmed
            } else {
                Classification::Pending
            },
            depth,
            broadcast_peers: 1,
        }),
        outputs: outputs
            .iter()
            .map(|(address, value)| TxOutput {
                value: *value,
                script_pubkey: address.as_bytes().to_vec(),
            })
            .collect(),
        is_coinbase: false,
        raw: vec![0xde, 0xad],
    }
}
