//! Credential rotation
//!
//! Changes the unlock credential of the open wallet in a single pass:
//!
//! 1. Check the old credential against the wallet; nothing else happens on mismatch
//! 2. Unwrap the backup key with the old credential key
//! 3. Wrap the backup key with the new credential key
//! 4. Decrypt the new wrap and compare it with the backup key
//! 5. Wrap the padded new credential with the backup key, decrypt, unpad and compare
//! 6. Commit: decrypt the wallet, write the summary, rewrite every bound
//!    store under the new credential, encrypt the wallet
//! 7. Publish the outcome
//!
//! Any failure before step 6 leaves every file under the old credential. A
//! failure during step 6 restores the old summary, re-seals the stores already
//! rewritten under the old credential and encrypts the wallet with it again.
//! Rotations are queued and run one at a time on a dedicated worker.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strongroom_storage::{pad_credential_bytes, unpad_credential_bytes, KeyCipher, WalletSummary};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::config::PaymentsConfig;
use crate::context::WalletContext;
use crate::error::{PaymentsError, Result};

/// A store whose file is sealed under the unlock credential
pub trait CredentialBoundStore: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Re-seal the store's file under `credential`
    fn rewrite(&self, credential: &str) -> Result<()>;
}

/// Why a rotation ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationReason {
    /// Credential changed
    Success,
    /// The old credential did not unlock the wallet
    WrongOldPassword,
    /// A cryptographic round trip did not reproduce its input
    ReversibilityFailure,
    /// Existing key material could not be read
    LoadFailure,
    /// New key material could not be produced or written
    SaveFailure,
    /// The rotation was invoked out of contract
    PreconditionViolation,
    /// The wallet refused to decrypt or encrypt
    Ledger,
    /// The rotation task itself failed
    Error,
}

/// Published once per rotation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationOutcome {
    /// Whether the new credential is now in force
    pub success: bool,
    /// Reason code
    pub reason: RotationReason,
    /// Failure detail
    pub detail: Option<String>,
}

impl RotationOutcome {
    /// Outcome of a finished rotation
    pub fn from_result(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                reason: RotationReason::Success,
                detail: None,
            },
            Err(PaymentsError::CredentialMismatch) => Self {
                success: false,
                reason: RotationReason::WrongOldPassword,
                detail: None,
            },
            Err(e) => {
                let reason = match e {
                    PaymentsError::ReversibilityFailure(_) => RotationReason::ReversibilityFailure,
                    PaymentsError::LoadFailure(_) => RotationReason::LoadFailure,
                    PaymentsError::SaveFailure(_) => RotationReason::SaveFailure,
                    PaymentsError::PreconditionViolation(_) => {
                        RotationReason::PreconditionViolation
                    }
                    PaymentsError::Ledger(_) => RotationReason::Ledger,
                    PaymentsError::CredentialMismatch => RotationReason::WrongOldPassword,
                };
                Self::failure(reason, e.to_string())
            }
        }
    }

    fn failure(reason: RotationReason, detail: String) -> Self {
        Self {
            success: false,
            reason,
            detail: Some(detail),
        }
    }
}

/// Performs rotations for one wallet
pub struct RotationEngine {
    context: Arc<WalletContext>,
    cipher: Arc<dyn KeyCipher>,
    stores: Vec<Arc<dyn CredentialBoundStore>>,
}

impl RotationEngine {
    /// Engine without any bound stores
    pub fn new(context: Arc<WalletContext>, cipher: Arc<dyn KeyCipher>) -> Self {
        Self {
            context,
            cipher,
            stores: Vec::new(),
        }
    }

    /// Rewrite `store` on commit; stores are rewritten in insertion order
    pub fn with_store(mut self, store: Arc<dyn CredentialBoundStore>) -> Self {
        self.stores.push(store);
        self
    }

    /// Change the credential from `old` to `new`. Blocking.
    pub fn rotate(&self, old: &str, new: &str) -> Result<()> {
        let wallet = self.context.wallet();
        let wallet_id = self.context.wallet_id();

        if !wallet.check_password(old) {
            warn!("Old credential does not match wallet {}", wallet_id);
            return Err(PaymentsError::CredentialMismatch);
        }
        info!("Changing credential of wallet {}", wallet_id);

        let cipher = self.cipher.as_ref();
        let summary = self.context.summary();

        let old_key = cipher.derive_key(old).map_err(PaymentsError::LoadFailure)?;
        let backup_key = summary
            .backup_key(cipher, &old_key)
            .map_err(PaymentsError::LoadFailure)?;

        let new_key = cipher.derive_key(new).map_err(PaymentsError::SaveFailure)?;
        let encrypted_backup_key = cipher
            .encrypt(&new_key, backup_key.as_bytes())
            .map_err(PaymentsError::SaveFailure)?;

        let reborn_backup_key = Zeroizing::new(
            cipher
                .decrypt(&new_key, &encrypted_backup_key)
                .map_err(|e| reversibility("backup key", e))?,
        );
        if reborn_backup_key.as_slice() != backup_key.as_bytes() {
            return Err(PaymentsError::ReversibilityFailure(
                "backup key differs after re-encryption".to_string(),
            ));
        }

        let padded = pad_credential_bytes(new.as_bytes());
        let encrypted_password = cipher
            .encrypt(&backup_key, &padded)
            .map_err(PaymentsError::SaveFailure)?;
        let reborn_padded = Zeroizing::new(
            cipher
                .decrypt(&backup_key, &encrypted_password)
                .map_err(|e| reversibility("credential", e))?,
        );
        let reborn_credential =
            unpad_credential_bytes(&reborn_padded).map_err(|e| reversibility("credential", e))?;
        if reborn_credential.as_slice() != new.as_bytes() {
            return Err(PaymentsError::ReversibilityFailure(
                "credential differs after re-encryption".to_string(),
            ));
        }
        debug!("Reversibility checks passed for wallet {}", wallet_id);

        wallet.decrypt(old)?;

        let mut updated = summary.clone();
        updated.encrypted_backup_key = encrypted_backup_key;
        updated.encrypted_password = encrypted_password;

        let mut rewritten = 0;
        if let Err(e) = self.commit(&updated, new, &mut rewritten) {
            error!(
                "Commit of new credential for wallet {} failed, rolling back: {}",
                wallet_id, e
            );
            self.roll_back(&summary, old, rewritten);
            return Err(e);
        }

        self.context.set_summary(updated);
        self.context.set_credential(new);
        info!("Credential of wallet {} changed", wallet_id);
        Ok(())
    }

    /// Step 6 once the wallet is decrypted; `rewritten` counts the stores
    /// already sealed under `new`
    fn commit(&self, updated: &WalletSummary, new: &str, rewritten: &mut usize) -> Result<()> {
        let wallet = self.context.wallet();
        updated
            .write(&self.context.summary_path())
            .map_err(PaymentsError::SaveFailure)?;

        for store in &self.stores {
            store.rewrite(new)?;
            *rewritten += 1;
            debug!("Rewrote {} under the new credential", store.name());
        }

        wallet.encrypt(new)?;
        Ok(())
    }

    /// Put every file back under `old` and lock the wallet with it
    fn roll_back(&self, original: &WalletSummary, old: &str, rewritten: usize) {
        if let Err(e) = original.write(&self.context.summary_path()) {
            error!("Could not restore wallet summary: {}", e);
        }
        for store in self.stores.iter().take(rewritten) {
            match store.rewrite(old) {
                Ok(()) => debug!("Restored {} under the old credential", store.name()),
                Err(e) => error!("Could not restore {}: {}", store.name(), e),
            }
        }
        if let Err(e) = self.context.wallet().encrypt(old) {
            error!("Could not re-encrypt wallet with the old credential: {}", e);
        }
    }
}

fn reversibility(what: &str, e: strongroom_storage::Error) -> PaymentsError {
    PaymentsError::ReversibilityFailure(format!("{} could not be decrypted: {}", what, e))
}

struct RotationRequest {
    old: Zeroizing<String>,
    new: Zeroizing<String>,
}

/// Queue in front of a single rotation worker
pub struct CredentialRotation {
    requests: mpsc::Sender<RotationRequest>,
    outcomes: broadcast::Sender<RotationOutcome>,
    worker: JoinHandle<()>,
}

impl CredentialRotation {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(engine: RotationEngine, queue_capacity: usize, outcome_capacity: usize) -> Self {
        let (requests, mut rx) = mpsc::channel::<RotationRequest>(queue_capacity.max(1));
        let (outcomes, _) = broadcast::channel(outcome_capacity.max(1));
        let engine = Arc::new(engine);
        let publisher = outcomes.clone();

        let worker = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let engine = Arc::clone(&engine);
                let joined =
                    tokio::task::spawn_blocking(move || engine.rotate(&request.old, &request.new))
                        .await;

                let outcome = match joined {
                    Ok(result) => {
                        if let Err(e) = &result {
                            error!("Credential rotation failed: {}", e);
                        }
                        RotationOutcome::from_result(&result)
                    }
                    Err(e) => {
                        error!("Credential rotation task aborted: {}", e);
                        RotationOutcome::failure(RotationReason::Error, e.to_string())
                    }
                };
                // no subscribers is not an error
                let _ = publisher.send(outcome);
            }
            debug!("Credential rotation worker stopped");
        });

        Self {
            requests,
            outcomes,
            worker,
        }
    }

    /// Start the worker with the channel capacities of `config`
    pub fn with_config(engine: RotationEngine, config: &PaymentsConfig) -> Self {
        Self::spawn(
            engine,
            config.rotation_queue_capacity,
            config.outcome_channel_capacity,
        )
    }

    /// Receive every outcome published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RotationOutcome> {
        self.outcomes.subscribe()
    }

    /// Queue a rotation
    pub async fn request(&self, old: &str, new: &str) -> Result<()> {
        let request = RotationRequest {
            old: Zeroizing::new(old.to_string()),
            new: Zeroizing::new(new.to_string()),
        };
        self.requests.send(request).await.map_err(|_| {
            PaymentsError::PreconditionViolation("Rotation worker has stopped".to_string())
        })
    }

    /// Stop accepting requests and wait for queued rotations to finish
    pub async fn shutdown(self) {
        drop(self.requests);
        if let Err(e) = self.worker.await {
            error!("Credential rotation worker panicked: {}", e);
        }
    }
}
