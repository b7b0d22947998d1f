//! PostgreSQL Account Store
//!
//! Each session is one `sqlx` transaction with a bounded `lock_timeout`.
//! Rows are locked one at a time with `SELECT ... FOR UPDATE`, in ascending
//! id order. Dropping an uncommitted `sqlx::Transaction` rolls it back, so a
//! cancelled request never leaves a lock behind.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use super::store::{AccountPair, AccountStore, StoreError, TransferCommit, TransferSession};
use crate::account::{Account, Invoice};
use crate::core_types::AccountId;
use crate::money::Money;

/// Account store backed by the `account` / `invoice` tables
pub struct PgAccountStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgAccountStore {
    /// Create a new store using the given connection pool
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn begin(&self) -> Result<Box<dyn TransferSession>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Same as SET LOCAL, but takes a bind parameter
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgTransferSession { tx }))
    }
}

/// One open PostgreSQL transaction
pub struct PgTransferSession {
    tx: Transaction<'static, Postgres>,
}

impl PgTransferSession {
    async fn update_balance(&mut self, id: AccountId, balance: Money) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE account SET balance = $1 WHERE id = $2")
            .bind(balance)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Backend(format!(
                "balance update touched {} rows for account {}",
                result.rows_affected(),
                id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TransferSession for PgTransferSession {
    async fn lock_and_fetch(&mut self, ids: AccountPair) -> Result<Vec<Account>, StoreError> {
        let mut accounts = Vec::with_capacity(2);

        // One statement per row so the acquisition order is explicit
        for id in ids.lock_order() {
            let row: Option<Account> = sqlx::query_as(
                r#"SELECT id, currency, overdraft, balance, create_date
                   FROM account WHERE id = $1
                   FOR UPDATE"#,
            )
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

            match row {
                Some(account) => accounts.push(account),
                None => debug!(account_id = id, "Account not found while locking"),
            }
        }

        Ok(accounts)
    }

    async fn commit_transfer(
        mut self: Box<Self>,
        commit: TransferCommit,
    ) -> Result<Invoice, StoreError> {
        self.update_balance(commit.account_from, commit.new_balance_from)
            .await?;
        self.update_balance(commit.account_to, commit.new_balance_to)
            .await?;

        let invoice: Invoice = sqlx::query_as(
            r#"
            INSERT INTO invoice (account_id_from, account_id_to, amount, transfer_status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_id_from, account_id_to, amount, transfer_status, create_date
            "#,
        )
        .bind(commit.invoice.account_id_from)
        .bind(commit.invoice.account_id_to)
        .bind(commit.invoice.amount)
        .bind(commit.invoice.transfer_status)
        .fetch_one(&mut *self.tx)
        .await?;

        self.tx.commit().await?;
        Ok(invoice)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        if let Err(e) = self.tx.rollback().await {
            warn!(error = %e, "Explicit rollback failed, connection will be discarded");
            return Err(e.into());
        }
        Ok(())
    }
}
