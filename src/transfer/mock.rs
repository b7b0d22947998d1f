//! In-memory account store for engine tests
//!
//! Every account sits behind its own `tokio::sync::Mutex`; a session holds
//! owned guards, so dropping the session releases its row locks exactly like
//! a rolled back PostgreSQL transaction.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use super::store::{AccountPair, AccountStore, StoreError, TransferCommit, TransferSession};
use crate::account::{Account, Invoice};
use crate::core_types::{AccountId, Currency};
use crate::money::Money;

type Row = Arc<RowLock<Account>>;

struct Inner {
    accounts: Mutex<BTreeMap<AccountId, Row>>,
    invoices: Mutex<Vec<Invoice>>,
    lock_log: Mutex<Vec<AccountId>>,
    next_account_id: AtomicI64,
    next_invoice_id: AtomicI64,
    fail_commit: AtomicBool,
    reverse_fetch_order: AtomicBool,
    lock_timeout: Duration,
}

/// Account store kept entirely in memory
#[derive(Clone)]
pub struct MemoryAccountStore {
    inner: Arc<Inner>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(Duration::from_millis(200))
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                accounts: Mutex::new(BTreeMap::new()),
                invoices: Mutex::new(Vec::new()),
                lock_log: Mutex::new(Vec::new()),
                next_account_id: AtomicI64::new(1),
                next_invoice_id: AtomicI64::new(1),
                fail_commit: AtomicBool::new(false),
                reverse_fetch_order: AtomicBool::new(false),
                lock_timeout,
            }),
        }
    }

    /// Insert an account with the next id
    pub fn add_account(&self, currency: Currency, overdraft: bool, balance: &str) -> AccountId {
        let id = self.inner.next_account_id.fetch_add(1, Ordering::SeqCst);
        let account = Account {
            id,
            currency,
            overdraft,
            // Signed literal so overdraft accounts can start negative
            balance: Money::from_decimal_exact(Decimal::from_str(balance).unwrap()).unwrap(),
            create_date: Utc::now(),
        };
        self.inner
            .accounts
            .lock()
            .unwrap()
            .insert(id, Arc::new(RowLock::new(account)));
        id
    }

    fn row(&self, id: AccountId) -> Option<Row> {
        self.inner.accounts.lock().unwrap().get(&id).cloned()
    }

    /// Committed balance (waits for any lock on the row)
    pub async fn balance_of(&self, id: AccountId) -> Money {
        self.row(id).unwrap().lock().await.balance
    }

    /// Committed snapshot of every account
    pub async fn accounts(&self) -> Vec<Account> {
        let rows: Vec<Row> = self.inner.accounts.lock().unwrap().values().cloned().collect();
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.lock().await.clone());
        }
        out
    }

    pub fn invoices(&self) -> Vec<Invoice> {
        self.inner.invoices.lock().unwrap().clone()
    }

    /// Account ids in the order their locks were granted
    pub fn lock_log(&self) -> Vec<AccountId> {
        self.inner.lock_log.lock().unwrap().clone()
    }

    /// Make the next commits fail as an infrastructure error
    pub fn set_fail_commit(&self, fail: bool) {
        self.inner.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Return locked rows in descending id order
    pub fn set_reverse_fetch_order(&self, reverse: bool) {
        self.inner.reverse_fetch_order.store(reverse, Ordering::SeqCst);
    }

    /// Hold a row lock from outside any transfer
    pub async fn hold_lock(&self, id: AccountId) -> OwnedMutexGuard<Account> {
        self.row(id).unwrap().lock_owned().await
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn begin(&self) -> Result<Box<dyn TransferSession>, StoreError> {
        Ok(Box::new(MemorySession {
            store: self.clone(),
            guards: Vec::with_capacity(2),
        }))
    }
}

struct MemorySession {
    store: MemoryAccountStore,
    guards: Vec<OwnedMutexGuard<Account>>,
}

#[async_trait]
impl TransferSession for MemorySession {
    async fn lock_and_fetch(&mut self, ids: AccountPair) -> Result<Vec<Account>, StoreError> {
        for id in ids.lock_order() {
            let Some(row) = self.store.row(id) else {
                continue;
            };
            let guard = tokio::time::timeout(self.store.inner.lock_timeout, row.lock_owned())
                .await
                .map_err(|_| StoreError::Conflict(format!("lock wait timeout on account {}", id)))?;
            self.store.inner.lock_log.lock().unwrap().push(id);
            self.guards.push(guard);
        }

        let mut rows: Vec<Account> = self.guards.iter().map(|g| (**g).clone()).collect();
        if self.store.inner.reverse_fetch_order.load(Ordering::SeqCst) {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn commit_transfer(
        mut self: Box<Self>,
        commit: TransferCommit,
    ) -> Result<Invoice, StoreError> {
        if self.store.inner.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }

        let from_idx = self.guards.iter().position(|g| g.id == commit.account_from);
        let to_idx = self.guards.iter().position(|g| g.id == commit.account_to);
        let (Some(from_idx), Some(to_idx)) = (from_idx, to_idx) else {
            return Err(StoreError::Backend("commit without both row locks".into()));
        };

        self.guards[from_idx].balance = commit.new_balance_from;
        self.guards[to_idx].balance = commit.new_balance_to;

        let invoice = Invoice {
            id: self.store.inner.next_invoice_id.fetch_add(1, Ordering::SeqCst),
            account_id_from: commit.invoice.account_id_from,
            account_id_to: commit.invoice.account_id_to,
            amount: commit.invoice.amount,
            transfer_status: commit.invoice.transfer_status,
            create_date: Utc::now(),
        };
        self.store.inner.invoices.lock().unwrap().push(invoice.clone());
        Ok(invoice)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
