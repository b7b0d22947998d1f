//! Core types used throughout the system
//!
//! Identifiers and the currency enumeration shared by the store, the
//! validation layer and the transfer engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account ID - system-assigned, immutable, positive.
///
/// # Usage:
/// - Primary key of the `account` table (BIGSERIAL)
/// - Defines the global lock order: rows are always locked by ascending id
pub type AccountId = i64;

/// Invoice ID - system-assigned primary key of the `invoice` table
pub type InvoiceId = i64;

/// Supported account currencies.
///
/// Fixed at account creation and never changed afterwards. Stored in
/// PostgreSQL as the `currency_choices` enum type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
    sqlx::Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "currency_choices", rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Rub,
}

impl Currency {
    /// All supported currencies, in matrix index order
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Rub];

    /// Row/column index into the exchange matrix
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Currency::Usd => 0,
            Currency::Eur => 1,
            Currency::Rub => 2,
        }
    }

    /// ISO 4217 code
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Rub => "RUB",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a currency code is not one of the supported ones
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency: '{0}'")]
pub struct UnknownCurrency(pub String);

impl FromStr for Currency {
    type Err = UnknownCurrency;

    /// Codes are matched exactly (upper case), as stored in the database.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "RUB" => Ok(Currency::Rub),
            other => Err(UnknownCurrency(other.to_string())),
        }
    }
}
