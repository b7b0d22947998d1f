//! Transfer Error Types
//!
//! One variant per outcome class of a transfer request. Business rejections
//! (`AccountsNotFound`, `InsufficientFunds`) are final; `Conflict` is the only
//! retryable failure.

use thiserror::Error;

use super::store::StoreError;
use crate::account::validation::ValidationError;
use crate::exchange::ExchangeError;

/// Transfer error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Validation Errors (before any lock) ===
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    // === Business Rejections (after lock, nothing written) ===
    #[error("accounts not found")]
    AccountsNotFound,

    #[error("insufficient balance")]
    InsufficientFunds,

    // === System Errors ===
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Lock conflict, retry later: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Get the error code for API responses and logs
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidArgument(_) => "INVALID_ARGUMENT",
            TransferError::AccountsNotFound => "ACCOUNTS_NOT_FOUND",
            TransferError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferError::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            TransferError::Conflict(_) => "CONFLICT",
            TransferError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for the gateway
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidArgument(_) => 400,
            TransferError::InsufficientFunds => 403,
            TransferError::AccountsNotFound => 404,
            TransferError::Conflict(_) => 409,
            TransferError::UnsupportedCurrency(_) | TransferError::Internal(_) => 500,
        }
    }

    /// `rejection` for business outcomes, `failed` for everything else
    pub fn status_label(&self) -> &'static str {
        if self.is_rejection() {
            "rejection"
        } else {
            "failed"
        }
    }

    /// Business-outcome rejection: must not be retried automatically
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TransferError::AccountsNotFound | TransferError::InsufficientFunds
        )
    }

    /// Safe to retry: no partial state exists
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::Conflict(_))
    }

    /// Reason safe to show to callers. Internal causes stay in the logs.
    pub fn public_reason(&self) -> String {
        match self {
            TransferError::UnsupportedCurrency(_) | TransferError::Internal(_) => {
                "internal server error".to_string()
            }
            TransferError::Conflict(_) => "conflict, retry later".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => TransferError::Conflict(msg),
            StoreError::Backend(msg) => TransferError::Internal(msg),
        }
    }
}

impl From<ExchangeError> for TransferError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::UnsupportedCurrency(code) => TransferError::UnsupportedCurrency(code),
            other => TransferError::Internal(other.to_string()),
        }
    }
}
