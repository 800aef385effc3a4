//! Transaction annotations
//!
//! Notes, fees and the fiat snapshot attached to a transaction hash. The
//! snapshot is pinned at first observation through `insert_if_absent`.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::fiat::FiatPayment;

/// Annotation attached to one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAnnotation {
    /// Transaction hash (unique key)
    pub hash: String,
    /// Free-text note
    pub note: Option<String>,
    /// Fiat valuation at first observation
    pub amount_fiat: FiatPayment,
    /// Mining fee paid, for outgoing transactions
    pub miner_fee: Option<u64>,
    /// Service fee paid, for outgoing transactions
    pub client_fee: Option<u64>,
}

impl TransactionAnnotation {
    /// Annotation holding only a fiat snapshot
    pub fn new(hash: impl Into<String>, amount_fiat: FiatPayment) -> Self {
        Self {
            hash: hash.into(),
            note: None,
            amount_fiat,
            miner_fee: None,
            client_fee: None,
        }
    }

    /// An annotation must carry the hash it is keyed by
    pub fn validate(&self) -> Result<()> {
        if self.hash.is_empty() {
            return Err(Error::Precondition(
                "Transaction annotation must have a hash".to_string(),
            ));
        }
        Ok(())
    }
}

/// Concurrent map of transaction hash -> annotation
#[derive(Debug, Default)]
pub struct AnnotationStore {
    annotations: RwLock<HashMap<String, TransactionAnnotation>>,
}

impl AnnotationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an annotation
    pub fn upsert(&self, annotation: TransactionAnnotation) -> Option<TransactionAnnotation> {
        self.annotations
            .write()
            .insert(annotation.hash.clone(), annotation)
    }

    /// Insert only if no annotation exists for the hash.
    ///
    /// Returns the stored annotation and whether this call inserted it.
    pub fn insert_if_absent(&self, annotation: TransactionAnnotation) -> (TransactionAnnotation, bool) {
        match self.annotations.write().entry(annotation.hash.clone()) {
            Entry::Occupied(existing) => (existing.get().clone(), false),
            Entry::Vacant(slot) => (slot.insert(annotation).clone(), true),
        }
    }

    /// Look up an annotation
    pub fn get(&self, hash: &str) -> Option<TransactionAnnotation> {
        self.annotations.read().get(hash).cloned()
    }

    /// Whether an annotation exists for the hash
    pub fn contains(&self, hash: &str) -> bool {
        self.annotations.read().contains_key(hash)
    }

    /// Remove an annotation
    pub fn remove(&self, hash: &str) -> Option<TransactionAnnotation> {
        self.annotations.write().remove(hash)
    }

    /// Snapshot of every annotation
    pub fn values(&self) -> Vec<TransactionAnnotation> {
        self.annotations.read().values().cloned().collect()
    }

    /// Number of annotations
    pub fn len(&self) -> usize {
        self.annotations.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.annotations.read().is_empty()
    }

    /// Drop every annotation
    pub fn clear(&self) {
        self.annotations.write().clear();
    }

    /// Replace the whole contents (used when loading a snapshot)
    pub fn replace_all(&self, annotations: impl IntoIterator<Item = TransactionAnnotation>) {
        let mut map = self.annotations.write();
        map.clear();
        for annotation in annotations {
            map.insert(annotation.hash.clone(), annotation);
        }
    }
}
