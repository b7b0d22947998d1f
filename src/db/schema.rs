//! Schema bootstrap and sample data
//!
//! Idempotent DDL for the `account` and `invoice` tables. Money columns are
//! `NUMERIC(20,2)`, matching [`crate::money::Money`].

use sqlx::PgPool;

use crate::core_types::Currency;
use crate::money::Money;

const CREATE_CURRENCY_TYPE: &str = r#"
DO $$ BEGIN
    CREATE TYPE currency_choices AS ENUM ('RUB', 'EUR', 'USD');
EXCEPTION
    WHEN duplicate_object THEN NULL;
END $$
"#;

const CREATE_ACCOUNT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS account (
    id          BIGSERIAL PRIMARY KEY,
    currency    currency_choices NOT NULL,
    overdraft   BOOLEAN NOT NULL DEFAULT FALSE,
    balance     NUMERIC(20, 2) NOT NULL DEFAULT 0,
    create_date TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_INVOICE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS invoice (
    id              BIGSERIAL PRIMARY KEY,
    account_id_from BIGINT NOT NULL REFERENCES account (id) ON DELETE CASCADE,
    account_id_to   BIGINT NOT NULL REFERENCES account (id) ON DELETE CASCADE,
    amount          NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    transfer_status BOOLEAN NOT NULL DEFAULT FALSE,
    create_date     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (account_id_from <> account_id_to)
)
"#;

const DROP_TABLES: &str = "DROP TABLE IF EXISTS invoice, account";

/// Create the currency enum and both tables if missing
pub async fn create_tables(pool: &PgPool) -> Result<(), sqlx::Error> {
    for ddl in [CREATE_CURRENCY_TYPE, CREATE_ACCOUNT_TABLE, CREATE_INVOICE_TABLE] {
        sqlx::raw_sql(ddl).execute(pool).await?;
    }
    tracing::info!("Schema ready (account, invoice)");
    Ok(())
}

/// Drop both tables (test teardown)
pub async fn drop_tables(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(DROP_TABLES).execute(pool).await?;
    Ok(())
}

/// Sample accounts: (currency, overdraft, opening balance)
pub fn sample_accounts() -> [(Currency, bool, &'static str); 3] {
    [
        (Currency::Usd, true, "10.05"),
        (Currency::Eur, false, "10000.05"),
        (Currency::Rub, false, "100000.05"),
    ]
}

/// Insert the sample accounts when the account table is empty.
///
/// Returns the number of rows inserted. No invoices are seeded: an invoice
/// only exists for a committed transfer.
pub async fn seed_sample_data(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM account")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        tracing::debug!(existing, "Account table not empty, skipping sample data");
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for (currency, overdraft, balance) in sample_accounts() {
        let balance = Money::parse(balance)
            .map_err(|e| sqlx::Error::Protocol(format!("bad sample balance: {}", e)))?;
        inserted += sqlx::query(
            "INSERT INTO account (currency, overdraft, balance) VALUES ($1, $2, $3)",
        )
        .bind(currency)
        .bind(overdraft)
        .bind(balance)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }
    tx.commit().await?;

    tracing::info!(inserted, "Sample accounts seeded");
    Ok(inserted)
}
