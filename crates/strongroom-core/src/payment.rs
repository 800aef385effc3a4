//! Derived payment views
//!
//! A payment is either an outstanding request or an adapted ledger
//! transaction. Payments are rebuilt on every query and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fiat::FiatPayment;
use crate::ledger::Classification;
use crate::request::PaymentRequest;
use crate::status::{PaymentStatus, PaymentType};

/// Ledger transaction adapted to the wallet's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayment {
    /// Transaction hash
    pub hash: String,
    /// Last update time
    pub date: DateTime<Utc>,
    /// Derived status
    pub status: PaymentStatus,
    /// Net signed value in base units
    pub amount: i64,
    /// Fiat valuation (pinned at first observation)
    pub amount_fiat: FiatPayment,
    /// Mining fee, outgoing only
    pub mining_fee: Option<u64>,
    /// Client fee, outgoing only
    pub client_fee: Option<u64>,
    /// Confidence classification, if the ledger reported one
    pub classification: Option<Classification>,
    /// Direction and progress
    pub payment_type: PaymentType,
    /// Human-readable description
    pub description: String,
    /// User note (empty when none)
    pub note: String,
    /// Coinbase flag
    pub is_coinbase: bool,
    /// Destination of every output
    pub output_addresses: Vec<String>,
    /// Hex of the serialized transaction
    pub raw_transaction: String,
    /// Serialized size in bytes
    pub size: usize,
}

/// Entry in the payments list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payment {
    /// Payment request that is not yet fully funded
    Request(PaymentRequest),
    /// Adapted transaction
    Transaction(TransactionPayment),
}

impl Payment {
    /// Signed amount in base units
    pub fn amount(&self) -> i64 {
        match self {
            Payment::Request(request) => i64::try_from(request.amount).unwrap_or(i64::MAX),
            Payment::Transaction(tx) => tx.amount,
        }
    }

    /// Date used for ordering
    pub fn date(&self) -> DateTime<Utc> {
        match self {
            Payment::Request(request) => request.date,
            Payment::Transaction(tx) => tx.date,
        }
    }

    /// Status
    pub fn status(&self) -> PaymentStatus {
        match self {
            Payment::Request(request) => request.status(),
            Payment::Transaction(tx) => tx.status,
        }
    }

    /// Type
    pub fn payment_type(&self) -> PaymentType {
        match self {
            Payment::Request(request) => request.payment_type(),
            Payment::Transaction(tx) => tx.payment_type,
        }
    }

    /// Description; a request is described by its label
    pub fn description(&self) -> &str {
        match self {
            Payment::Request(request) => request.label.as_deref().unwrap_or_default(),
            Payment::Transaction(tx) => &tx.description,
        }
    }

    /// Note (empty when none)
    pub fn note(&self) -> &str {
        match self {
            Payment::Request(request) => request.note.as_deref().unwrap_or_default(),
            Payment::Transaction(tx) => &tx.note,
        }
    }

    /// Fiat valuation
    pub fn amount_fiat(&self) -> &FiatPayment {
        match self {
            Payment::Request(request) => &request.amount_fiat,
            Payment::Transaction(tx) => &tx.amount_fiat,
        }
    }

    /// The request, if this is one
    pub fn as_request(&self) -> Option<&PaymentRequest> {
        match self {
            Payment::Request(request) => Some(request),
            Payment::Transaction(_) => None,
        }
    }

    /// The transaction, if this is one
    pub fn as_transaction(&self) -> Option<&TransactionPayment> {
        match self {
            Payment::Request(_) => None,
            Payment::Transaction(tx) => Some(tx),
        }
    }
}

impl From<PaymentRequest> for Payment {
    fn from(request: PaymentRequest) -> Self {
        Payment::Request(request)
    }
}

impl From<TransactionPayment> for Payment {
    fn from(tx: TransactionPayment) -> Self {
        Payment::Transaction(tx)
    }
}
