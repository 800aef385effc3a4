//! Strongroom payments core
//!
//! This crate implements the wallet's payment model: payment requests,
//! transaction annotations, status derivation, the ledger adapter and the
//! payment list queries.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod annotation;
pub mod error;
pub mod fiat;
pub mod ledger;
pub mod payment;
pub mod query;
pub mod request;
pub mod status;

pub use adapter::LedgerAdapter;
pub use annotation::{AnnotationStore, TransactionAnnotation};
pub use error::{Error, ErrorCategory, Result};
pub use fiat::{FiatPayment, BASE_UNITS_PER_COIN};
pub use ledger::{
    AddressResolver, Classification, Confidence, ExchangeRate, ExchangeRateSource,
    LedgerTransaction, LedgerWallet, NoExchangeRate, TxOutput, WalletCredentials, WalletId,
    WalletView,
};
pub use payment::{Payment, TransactionPayment};
pub use query::{filter_payments_by_content, sort_payments, subset_payments_and_sort};
pub use request::{PaymentRequest, PaymentRequestStore};
pub use status::{
    calculate_payment_type, calculate_status, PaymentStatus, PaymentType, RagStatus, StatusKey,
};
