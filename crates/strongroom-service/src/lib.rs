//! Strongroom payments service
//!
//! Wires the payments model and the encrypted storage to an open wallet:
//! the payments service, the transaction-seen listener and the credential
//! rotation worker.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod payments;
pub mod rotation;
pub mod seen;

pub use config::{PaymentsConfig, DATA_DIR_ENV};
pub use context::WalletContext;
pub use error::{PaymentsError, Result};
pub use logging::init_tracing;
pub use payments::PaymentsService;
pub use rotation::{
    CredentialBoundStore, CredentialRotation, RotationEngine, RotationOutcome, RotationReason,
};
pub use seen::{spawn_configured_seen_listener, spawn_seen_listener, TransactionSeen};
