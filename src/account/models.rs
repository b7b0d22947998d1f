//! Data models for accounts and invoices

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::core_types::{AccountId, Currency, InvoiceId};
use crate::money::Money;

/// Balance-holding account denominated in one fixed currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct Account {
    #[schema(example = 1)]
    pub id: AccountId,
    pub currency: Currency,
    /// If true the balance may go negative
    pub overdraft: bool,
    #[schema(value_type = String, example = "10.05")]
    pub balance: Money,
    pub create_date: DateTime<Utc>,
}

impl Account {
    /// Whether a debit leaving `new_balance` behind is allowed
    #[inline]
    pub fn allows_balance(&self, new_balance: Money) -> bool {
        self.overdraft || !new_balance.is_negative()
    }
}

/// Persisted record of one committed fund movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct Invoice {
    #[schema(example = 42)]
    pub id: InvoiceId,
    pub account_id_from: AccountId,
    pub account_id_to: AccountId,
    /// Source-currency amount, before conversion
    #[schema(value_type = String, example = "10.05")]
    pub amount: Money,
    pub transfer_status: bool,
    pub create_date: DateTime<Utc>,
}

/// Invoice fields known before the store assigns `id` and `create_date`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub account_id_from: AccountId,
    pub account_id_to: AccountId,
    pub amount: Money,
    pub transfer_status: bool,
}
