//! Account Store seam
//!
//! The transfer engine talks to persistence only through these traits. A
//! [`TransferSession`] is one open transaction: it locks rows, then either
//! commits the transfer or rolls back. Dropping a session without committing
//! must roll back and release every lock it holds (this is what makes a
//! client disconnect safe: the request future is dropped with the session).

use async_trait::async_trait;
use thiserror::Error;

use crate::account::{Account, Invoice, NewInvoice};
use crate::core_types::AccountId;
use crate::money::Money;

/// Store failures, classified by whether a retry can succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Lock wait timed out, deadlock victim or serialization failure
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other infrastructure failure
    #[error("backend error: {0}")]
    Backend(String),
}

/// PostgreSQL SQLSTATE codes that mean "try again"
const RETRYABLE_SQLSTATES: [&str; 3] = [
    "55P03", // lock_not_available (lock_timeout)
    "40P01", // deadlock_detected
    "40001", // serialization_failure
];

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let retryable = e
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&&*code));

        if retryable {
            StoreError::Conflict(e.to_string())
        } else {
            StoreError::Backend(e.to_string())
        }
    }
}

/// Two distinct account ids, kept in ascending order.
///
/// The ascending order is the global lock order every transfer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPair {
    low: AccountId,
    high: AccountId,
}

impl AccountPair {
    /// `None` when both ids are equal
    pub fn new(a: AccountId, b: AccountId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Ids in lock-acquisition order
    #[inline]
    pub fn lock_order(&self) -> [AccountId; 2] {
        [self.low, self.high]
    }

    #[inline]
    pub fn contains(&self, id: AccountId) -> bool {
        id == self.low || id == self.high
    }
}

/// Everything written by a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommit {
    pub account_from: AccountId,
    pub new_balance_from: Money,
    pub account_to: AccountId,
    pub new_balance_to: Money,
    pub invoice: NewInvoice,
}

/// Factory for transfer transactions
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Open a new transaction
    async fn begin(&self) -> Result<Box<dyn TransferSession>, StoreError>;
}

/// One open transfer transaction
#[async_trait]
pub trait TransferSession: Send {
    /// Lock the given rows exclusively, in ascending id order, and return
    /// their snapshots.
    ///
    /// Missing ids are skipped: the result has fewer than two entries when
    /// an account does not exist. Row order in the result is unspecified.
    async fn lock_and_fetch(&mut self, ids: AccountPair) -> Result<Vec<Account>, StoreError>;

    /// Write both balances and insert the invoice as one atomic unit, then
    /// release the locks. On error nothing is written.
    async fn commit_transfer(
        self: Box<Self>,
        commit: TransferCommit,
    ) -> Result<Invoice, StoreError>;

    /// Abandon the transaction and release the locks
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
