//! Error types for Strongroom Core
//!
//! Errors raised while deriving payment state from the ledger.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Strongroom Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An output script could not be turned into an address
    #[error("Address resolution failed: {0}")]
    AddressResolution(String),

    /// Operation invoked before the state it needs exists
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// The wallet runtime refused an operation
    #[error("Wallet error: {0}")]
    Wallet(String),
}

impl Error {
    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::AddressResolution(_) => ErrorCategory::Address,
            Error::Precondition(_) => ErrorCategory::Internal,
            Error::Wallet(_) => ErrorCategory::Wallet,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Address-related errors
    Address,
    /// Wallet-related errors
    Wallet,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Address => write!(f, "Address"),
            ErrorCategory::Wallet => write!(f, "Wallet"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
