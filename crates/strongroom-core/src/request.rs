//! Payment requests and their in-memory store
//!
//! Requests are keyed by destination address. The store tracks funding
//! bookkeeping and keeps a single "last deleted" slot for one-step undo.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::fiat::FiatPayment;
use crate::status::{PaymentStatus, PaymentType, RagStatus, StatusKey};

/// Outstanding payment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Destination address (unique key)
    pub address: String,
    /// Requested amount in base units
    pub amount: u64,
    /// Amount paid so far in base units
    pub paid_amount: u64,
    /// Label shown to the payer
    pub label: Option<String>,
    /// Private note
    pub note: Option<String>,
    /// Creation time
    pub date: DateTime<Utc>,
    /// Fiat valuation when the request was made
    pub amount_fiat: FiatPayment,
    /// Hashes of the transactions that fund this request, in arrival order
    pub paying_transaction_hashes: Vec<String>,
}

impl PaymentRequest {
    /// Create an unfunded request
    pub fn new(address: impl Into<String>, amount: u64, date: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            amount,
            paid_amount: 0,
            label: None,
            note: None,
            date,
            amount_fiat: FiatPayment::default(),
            paying_transaction_hashes: Vec::new(),
        }
    }

    /// Set label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Set fiat snapshot
    pub fn with_amount_fiat(mut self, amount_fiat: FiatPayment) -> Self {
        self.amount_fiat = amount_fiat;
        self
    }

    /// A request must carry the address it is keyed by
    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(Error::Precondition(
                "Payment request must have an address".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the paid amount covers the requested amount
    pub fn is_fully_funded(&self) -> bool {
        self.paid_amount >= self.amount
    }

    /// Requested, or part paid once any funds arrived
    pub fn payment_type(&self) -> PaymentType {
        if self.paid_amount > 0 && !self.is_fully_funded() {
            PaymentType::PartPaid
        } else {
            PaymentType::Requested
        }
    }

    /// Status shown for a request in the payments list
    pub fn status(&self) -> PaymentStatus {
        match self.payment_type() {
            PaymentType::PartPaid => {
                PaymentStatus::new(RagStatus::Amber, StatusKey::PaymentPartPaid)
            }
            _ => PaymentStatus::new(RagStatus::Amber, StatusKey::PaymentRequested),
        }
    }

    /// Add a funding transaction once. Returns `true` on first association.
    fn record_funding(&mut self, transaction_hash: &str, value: u64) -> bool {
        if self
            .paying_transaction_hashes
            .iter()
            .any(|hash| hash == transaction_hash)
        {
            return false;
        }
        self.paying_transaction_hashes.push(transaction_hash.to_string());
        self.paid_amount = self.paid_amount.saturating_add(value);
        true
    }
}

/// Concurrent map of address -> payment request
#[derive(Debug, Default)]
pub struct PaymentRequestStore {
    requests: RwLock<HashMap<String, PaymentRequest>>,
    last_deleted: Mutex<Option<PaymentRequest>>,
}

impl PaymentRequestStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a request
    pub fn upsert(&self, request: PaymentRequest) -> Option<PaymentRequest> {
        self.requests.write().insert(request.address.clone(), request)
    }

    /// Look up a request by address
    pub fn get(&self, address: &str) -> Option<PaymentRequest> {
        self.requests.read().get(address).cloned()
    }

    /// Remove a request without touching the undo slot
    pub fn remove(&self, address: &str) -> Option<PaymentRequest> {
        self.requests.write().remove(address)
    }

    /// Snapshot of every request
    pub fn values(&self) -> Vec<PaymentRequest> {
        self.requests.read().values().cloned().collect()
    }

    /// Number of requests
    pub fn len(&self) -> usize {
        self.requests.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.requests.read().is_empty()
    }

    /// Drop every request and the undo slot
    pub fn clear(&self) {
        self.requests.write().clear();
        *self.last_deleted.lock() = None;
    }

    /// Replace the whole contents (used when loading a snapshot)
    pub fn replace_all(&self, requests: impl IntoIterator<Item = PaymentRequest>) {
        let mut map = self.requests.write();
        map.clear();
        for request in requests {
            map.insert(request.address.clone(), request);
        }
    }

    /// Requests that are not fully funded
    pub fn outstanding(&self) -> Vec<PaymentRequest> {
        self.requests
            .read()
            .values()
            .filter(|request| !request.is_fully_funded())
            .cloned()
            .collect()
    }

    /// Associate a funding transaction with the request at `address`.
    ///
    /// The paid amount only grows on the first association of a given hash.
    /// Returns the request after bookkeeping, or `None` if no request exists.
    pub fn record_funding(
        &self,
        address: &str,
        transaction_hash: &str,
        value: u64,
    ) -> Option<PaymentRequest> {
        let mut map = self.requests.write();
        let request = map.get_mut(address)?;
        if request.record_funding(transaction_hash, value) {
            tracing::debug!(
                "Transaction {} funds payment request {} (paid {} of {})",
                transaction_hash,
                address,
                request.paid_amount,
                request.amount
            );
        }
        Some(request.clone())
    }

    /// Requests whose address appears in `addresses`
    pub fn funded_by<'a>(&self, addresses: impl IntoIterator<Item = &'a str>) -> Vec<PaymentRequest> {
        let map = self.requests.read();
        addresses
            .into_iter()
            .filter_map(|address| map.get(address).cloned())
            .collect()
    }

    /// Remove a request, keeping it as the single undo candidate
    pub fn delete(&self, address: &str) -> Option<PaymentRequest> {
        let removed = self.requests.write().remove(address)?;
        *self.last_deleted.lock() = Some(removed.clone());
        Some(removed)
    }

    /// Restore the most recently deleted request, if any
    pub fn undo_delete(&self) -> Option<PaymentRequest> {
        let restored = self.last_deleted.lock().take()?;
        self.upsert(restored.clone());
        Some(restored)
    }

    /// Whether a deleted request is waiting in the undo slot
    pub fn can_undo_delete(&self) -> bool {
        self.last_deleted.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn request(address: &str, amount: u64) -> PaymentRequest {
        PaymentRequest::new(address, amount, Utc.timestamp_millis_opt(1_400_000_000_000).unwrap())
    }

    #[test]
    fn test_validate_requires_address() {
        assert!(request("1Addr", 5).validate().is_ok());
        let err = request("", 5).validate().unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(err.category(), crate::ErrorCategory::Internal);
    }

    #[test]
    fn test_outstanding_excludes_fully_funded() {
        let store = PaymentRequestStore::new();
        let mut paid = request("1Paid", 1_000);
        paid.paid_amount = 1_000;
        let mut partial = request("1Partial", 1_000);
        partial.paid_amount = 999;
        store.upsert(paid);
        store.upsert(partial);
        store.upsert(request("1Fresh", 5));

        let mut outstanding: Vec<String> =
            store.outstanding().into_iter().map(|r| r.address).collect();
        outstanding.sort();
        assert_eq!(outstanding, vec!["1Fresh".to_string(), "1Partial".to_string()]);
    }

    #[test]
    fn test_record_funding_is_idempotent() {
        let store = PaymentRequestStore::new();
        store.upsert(request("1Addr", 10_000));

        let first = store.record_funding("1Addr", "aa", 4_000).unwrap();
        assert_eq!(first.paid_amount, 4_000);
        let second = store.record_funding("1Addr", "aa", 4_000).unwrap();
        assert_eq!(second.paid_amount, 4_000);
        assert_eq!(second.paying_transaction_hashes, vec!["aa".to_string()]);

        let third = store.record_funding("1Addr", "bb", 1_000).unwrap();
        assert_eq!(third.paid_amount, 5_000);
        assert_eq!(third.paying_transaction_hashes.len(), 2);

        assert!(store.record_funding("1Missing", "aa", 1).is_none());
    }

    #[test]
    fn test_concurrent_funding_counts_once() {
        let store = Arc::new(PaymentRequestStore::new());
        store.upsert(request("1Addr", 10_000));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.record_funding("1Addr", "cafe", 700);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let funded = store.get("1Addr").unwrap();
        assert_eq!(funded.paid_amount, 700);
        assert_eq!(funded.paying_transaction_hashes.len(), 1);
    }

    #[test]
    fn test_single_level_undo() {
        let store = PaymentRequestStore::new();
        store.upsert(request("1A", 1));
        store.upsert(request("1B", 2));

        store.delete("1A").unwrap();
        store.delete("1B").unwrap();
        assert!(store.is_empty());

        let restored = store.undo_delete().unwrap();
        assert_eq!(restored.address, "1B");
        assert!(store.undo_delete().is_none());
        assert!(store.get("1A").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_payment_type_of_request() {
        let mut req = request("1A", 100);
        assert_eq!(req.payment_type(), PaymentType::Requested);
        req.paid_amount = 40;
        assert_eq!(req.payment_type(), PaymentType::PartPaid);
        assert_eq!(req.status().key, StatusKey::PaymentPartPaid);
        req.paid_amount = 100;
        assert!(req.is_fully_funded());
    }

    #[test]
    fn test_funded_by() {
        let store = PaymentRequestStore::new();
        store.upsert(request("1A", 1));
        store.upsert(request("1B", 2));
        let funded = store.funded_by(["1B", "1Z"]);
        assert_eq!(funded.len(), 1);
        assert_eq!(funded[0].address, "1B");
    }
}
