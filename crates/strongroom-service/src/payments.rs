//! Payments service
//!
//! Owns the payment request and annotation stores of one open wallet,
//! adapts ledger transactions into payments and persists both stores to
//! `<wallet-directory>/payments/payments.aes`.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use strongroom_core::{
    filter_payments_by_content, sort_payments, subset_payments_and_sort, AnnotationStore,
    LedgerAdapter, LedgerTransaction, Payment, PaymentRequest, PaymentRequestStore, PaymentType,
    TransactionAnnotation, TransactionPayment,
};
use strongroom_storage::{EncryptedFileStore, KeyCipher, PaymentsFile};
use tracing::{debug, error, warn};

use crate::config::PaymentsConfig;
use crate::context::WalletContext;
use crate::error::{PaymentsError, Result};
use crate::rotation::CredentialBoundStore;

/// Payments of one open wallet
pub struct PaymentsService {
    context: Arc<WalletContext>,
    store: EncryptedFileStore,
    file: PaymentsFile,
    requests: PaymentRequestStore,
    annotations: AnnotationStore,
    last_seen: RwLock<Vec<Payment>>,
    load_failure: Mutex<Option<PaymentsError>>,
}

impl PaymentsService {
    /// Service over the wallet in `context`; call [`initialise`](Self::initialise) next
    pub fn new(context: Arc<WalletContext>, cipher: Arc<dyn KeyCipher>) -> Self {
        let file = PaymentsFile::for_wallet_directory(context.wallet_directory());
        Self {
            context,
            store: EncryptedFileStore::new(cipher),
            file,
            requests: PaymentRequestStore::new(),
            annotations: AnnotationStore::new(),
            last_seen: RwLock::new(Vec::new()),
            load_failure: Mutex::new(None),
        }
    }

    /// Service sealing its file with the cipher of `config`
    pub fn with_config(context: Arc<WalletContext>, config: &PaymentsConfig) -> Self {
        Self::new(context, Arc::new(config.cipher()))
    }

    /// Create the payments directory and load the stored snapshot.
    ///
    /// A missing file leaves the stores empty. An unreadable file is logged
    /// and kept for [`take_load_failure`](Self::take_load_failure); the
    /// stores also start empty in that case.
    pub fn initialise(&self) -> Result<()> {
        self.file
            .ensure_directory()
            .map_err(PaymentsError::LoadFailure)?;

        if let Err(e) = self.read_payments() {
            warn!(
                "Could not read payments for wallet {}, starting empty: {}",
                self.context.wallet_id(),
                e
            );
            self.requests.clear();
            self.annotations.clear();
            *self.load_failure.lock() = Some(e);
        }
        Ok(())
    }

    /// Failure recorded by the last [`initialise`](Self::initialise), if any
    pub fn take_load_failure(&self) -> Option<PaymentsError> {
        self.load_failure.lock().take()
    }

    /// Wallet context
    pub fn context(&self) -> &Arc<WalletContext> {
        &self.context
    }

    fn adapter(&self) -> LedgerAdapter<'_> {
        LedgerAdapter::new(
            &self.requests,
            &self.annotations,
            self.context.resolver().as_ref(),
            self.context.rates().as_ref(),
        )
    }

    /// Every wallet transaction plus every outstanding request, sorted.
    ///
    /// The list is remembered for [`filter_payments_by_content`](Self::filter_payments_by_content).
    pub fn payment_data_list(&self) -> Result<Vec<Payment>> {
        let wallet = self.context.wallet();
        let adapter = self.adapter();

        let mut payments = wallet
            .transactions()
            .iter()
            .map(|tx| {
                adapter
                    .adapt(wallet.as_ref(), tx)
                    .map(Payment::from)
                    .map_err(|e| ledger_failure(&tx.hash, e))
            })
            .collect::<Result<Vec<_>>>()?;
        payments.extend(self.requests.outstanding().into_iter().map(Payment::from));
        sort_payments(&mut payments);

        *self.last_seen.write() = payments.clone();
        Ok(payments)
    }

    /// Today's payments of the filter's kind, sorted
    pub fn subset_payments_and_sort(&self, payments: &[Payment], filter: PaymentType) -> Vec<Payment> {
        subset_payments_and_sort(payments, filter, Utc::now().date_naive())
    }

    /// Search the last list returned by [`payment_data_list`](Self::payment_data_list)
    pub fn filter_payments_by_content(&self, query: &str) -> Vec<Payment> {
        filter_payments_by_content(&self.last_seen.read(), query)
    }

    /// Adapt a single ledger transaction
    pub fn adapt_transaction(&self, transaction: &LedgerTransaction) -> Result<TransactionPayment> {
        let wallet = self.context.wallet();
        self.adapter()
            .adapt(wallet.as_ref(), transaction)
            .map_err(|e| ledger_failure(&transaction.hash, e))
    }

    /// Replace both stores with the stored snapshot
    pub fn read_payments(&self) -> Result<()> {
        let credential = self.context.credential();
        let snapshot = self
            .file
            .load(&self.store, &credential)
            .map_err(PaymentsError::LoadFailure)?;

        match snapshot {
            Some(snapshot) => {
                debug!(
                    "Read {} payment requests and {} transaction annotations",
                    snapshot.requests.len(),
                    snapshot.annotations.len()
                );
                self.requests.replace_all(snapshot.requests);
                self.annotations.replace_all(snapshot.annotations);
            }
            None => {
                debug!("No payments file at {}", self.file.path().display());
                self.requests.clear();
                self.annotations.clear();
            }
        }
        Ok(())
    }

    /// Persist both stores under the current credential
    pub fn write_payments(&self) -> Result<()> {
        let credential = self.context.credential();
        self.write_payments_with(&credential)
    }

    fn write_payments_with(&self, credential: &str) -> Result<()> {
        let requests = self.requests.values();
        let annotations = self.annotations.values();
        self.file
            .save(&self.store, credential, &requests, &annotations)
            .map_err(PaymentsError::SaveFailure)?;
        debug!(
            "Wrote {} payment requests and {} transaction annotations",
            requests.len(),
            annotations.len()
        );
        Ok(())
    }

    /// Add or replace a payment request
    pub fn add_payment_request(&self, request: PaymentRequest) -> Result<()> {
        request.validate().map_err(contract)?;
        self.requests.upsert(request);
        Ok(())
    }

    /// Every payment request, funded or not
    pub fn payment_requests(&self) -> Vec<PaymentRequest> {
        self.requests.values()
    }

    /// Payment request at an address
    pub fn payment_request(&self, address: &str) -> Option<PaymentRequest> {
        self.requests.get(address)
    }

    /// Add or replace a transaction annotation
    pub fn add_transaction_annotation(&self, annotation: TransactionAnnotation) -> Result<()> {
        annotation.validate().map_err(contract)?;
        self.annotations.upsert(annotation);
        Ok(())
    }

    /// Annotation of a transaction
    pub fn transaction_annotation(&self, hash: &str) -> Option<TransactionAnnotation> {
        self.annotations.get(hash)
    }

    /// Requests paid by any output of the transaction
    pub fn find_payment_requests_funded_by(&self, payment: &TransactionPayment) -> Vec<PaymentRequest> {
        self.requests
            .funded_by(payment.output_addresses.iter().map(String::as_str))
    }

    /// Delete a request (undoable once) and persist
    pub fn delete_payment_request(&self, address: &str) -> Result<Option<PaymentRequest>> {
        let deleted = self.requests.delete(address);
        if deleted.is_some() {
            self.write_payments()?;
        }
        Ok(deleted)
    }

    /// Restore the most recently deleted request and persist
    pub fn undo_delete_payment_request(&self) -> Result<Option<PaymentRequest>> {
        let restored = self.requests.undo_delete();
        if restored.is_some() {
            self.write_payments()?;
        }
        Ok(restored)
    }

    /// Whether a deleted request can be restored
    pub fn can_undo_delete(&self) -> bool {
        self.requests.can_undo_delete()
    }

    /// Pin the fiat value of a transaction seen on the network
    pub fn on_transaction_seen(&self, hash: &str, amount: i64) -> bool {
        self.adapter().note_transaction_seen(hash, amount)
    }

    /// Flush both stores; failures are logged
    pub fn shutdown(&self) {
        if let Err(e) = self.write_payments() {
            error!(
                "Could not write payments for wallet {} on shutdown: {}",
                self.context.wallet_id(),
                e
            );
        }
    }
}

/// Contract breaches keep their own variant
fn contract(e: strongroom_core::Error) -> PaymentsError {
    match e {
        strongroom_core::Error::Precondition(detail) => PaymentsError::PreconditionViolation(detail),
        other => PaymentsError::Ledger(other),
    }
}

fn ledger_failure(hash: &str, e: strongroom_core::Error) -> PaymentsError {
    warn!("Could not adapt transaction {} [{}]: {}", hash, e.category(), e);
    contract(e)
}

impl CredentialBoundStore for PaymentsService {
    fn name(&self) -> &str {
        "payments"
    }

    fn rewrite(&self, credential: &str) -> Result<()> {
        self.write_payments_with(credential)
    }
}

impl std::fmt::Debug for PaymentsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsService")
            .field("file", &self.file)
            .field("requests", &self.requests.len())
            .field("annotations", &self.annotations.len())
            .finish_non_exhaustive()
    }
}
