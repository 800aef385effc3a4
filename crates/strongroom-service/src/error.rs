//! Error types

use strongroom_storage::Error as StorageError;

/// Payments service errors
#[derive(Debug, thiserror::Error)]
pub enum PaymentsError {
    /// The backing file exists but cannot be read, opened or decoded
    #[error("Failed to load payments: {0}")]
    LoadFailure(#[source] StorageError),

    /// Sealing or writing failed
    #[error("Failed to save: {0}")]
    SaveFailure(#[source] StorageError),

    /// The supplied credential does not unlock the wallet
    #[error("Credential does not match the wallet")]
    CredentialMismatch,

    /// A re-encrypted secret did not decrypt back to the original
    #[error("Reversibility check failed: {0}")]
    ReversibilityFailure(String),

    /// An operation was called in a state that does not allow it
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// Error raised by the ledger side
    #[error("Ledger error: {0}")]
    Ledger(#[from] strongroom_core::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, PaymentsError>;
