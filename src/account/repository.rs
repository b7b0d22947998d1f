//! Repository layer for single-account reads and creation
//!
//! Balance mutation is not available here: balances change only inside a
//! transfer transaction (see `crate::transfer::pg_store`).

use sqlx::PgPool;

use super::models::{Account, Invoice};
use crate::core_types::{AccountId, Currency, InvoiceId};

/// Account repository for read/create operations
pub struct AccountRepository;

impl AccountRepository {
    /// Get account by ID (committed state only)
    pub async fn get_by_id(pool: &PgPool, id: AccountId) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<Account> = sqlx::query_as(
            r#"SELECT id, currency, overdraft, balance, create_date
               FROM account WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Create a new account with a zero balance
    pub async fn create(
        pool: &PgPool,
        currency: Currency,
        overdraft: bool,
    ) -> Result<Account, sqlx::Error> {
        let account: Account = sqlx::query_as(
            r#"INSERT INTO account (currency, overdraft)
               VALUES ($1, $2)
               RETURNING id, currency, overdraft, balance, create_date"#,
        )
        .bind(currency)
        .bind(overdraft)
        .fetch_one(pool)
        .await?;

        tracing::info!(account_id = account.id, currency = %currency, overdraft, "Account created");
        Ok(account)
    }
}

/// Invoice repository (read-only; invoices are written by the transfer engine)
pub struct InvoiceRepository;

impl InvoiceRepository {
    /// Get invoice by ID
    pub async fn get_by_id(pool: &PgPool, id: InvoiceId) -> Result<Option<Invoice>, sqlx::Error> {
        let row: Option<Invoice> = sqlx::query_as(
            r#"SELECT id, account_id_from, account_id_to, amount, transfer_status, create_date
               FROM invoice WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Count invoices touching an account, in either direction
    pub async fn count_for_account(pool: &PgPool, id: AccountId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM invoice WHERE account_id_from = $1 OR account_id_to = $1",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }
}
