//! Input validation for raw request parameters
//!
//! Converts untyped query-string values into typed, constrained values.
//! Every function here is pure and runs before the account store is touched.

use crate::core_types::{AccountId, Currency};
use crate::money::{Money, MoneyError};

// ============================================================================
// Validation Errors
// ============================================================================

/// Validation errors for request parameters
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing parameter: {0}")]
    Missing(&'static str),

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Source and destination accounts must differ")]
    SameAccount,
}

// ============================================================================
// Parsers
// ============================================================================

/// Parse an account id: ASCII digits only, positive, fits in 64 bits.
///
/// # Examples
/// ```
/// use simple_billing::account::validation::parse_account_id;
///
/// assert_eq!(parse_account_id("42").unwrap(), 42);
/// assert!(parse_account_id("vfnjgcf").is_err());
/// ```
pub fn parse_account_id(text: &str) -> Result<AccountId, ValidationError> {
    const EXPECTED: &str = "positive integer";

    let invalid = || ValidationError::InvalidFormat {
        field: "account_id",
        value: text.to_string(),
        expected: EXPECTED,
    };

    if text.is_empty() {
        return Err(ValidationError::Missing("account_id"));
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let id: AccountId = text.parse().map_err(|_| invalid())?;
    if id == 0 {
        return Err(invalid());
    }
    Ok(id)
}

/// Parse a strictly positive amount with at most two fractional digits
pub fn parse_amount(text: &str) -> Result<Money, ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::Missing("amount"));
    }

    let amount = Money::parse(text)?;
    if amount.is_zero() {
        return Err(ValidationError::ZeroAmount);
    }
    Ok(amount)
}

/// Parse one of the supported currency codes (`USD`, `EUR`, `RUB`)
pub fn parse_currency(text: &str) -> Result<Currency, ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::Missing("currency"));
    }
    text.parse().map_err(|_| ValidationError::InvalidFormat {
        field: "currency",
        value: text.to_string(),
        expected: "USD, EUR or RUB",
    })
}

/// Parse a boolean flag: `true` / `false`, case-insensitive
pub fn parse_boolean(text: &str) -> Result<bool, ValidationError> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else if text.is_empty() {
        Err(ValidationError::Missing("boolean"))
    } else {
        Err(ValidationError::InvalidFormat {
            field: "boolean",
            value: text.to_string(),
            expected: "true or false",
        })
    }
}

// ============================================================================
// Validated transfer request
// ============================================================================

/// Transfer parameters that passed validation
///
/// Fields are private; [`TransferRequest::parse`] and [`TransferRequest::new`]
/// are the only ways to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    from: AccountId,
    to: AccountId,
    amount: Money,
}

impl TransferRequest {
    /// Validate raw transfer parameters
    pub fn parse(from: &str, to: &str, amount: &str) -> Result<Self, ValidationError> {
        let from = parse_account_id(from)?;
        let to = parse_account_id(to)?;
        let amount = parse_amount(amount)?;
        Self::new(from, to, amount)
    }

    /// Build from already-typed values; rejects `from == to` and non-positive
    /// amounts.
    pub fn new(from: AccountId, to: AccountId, amount: Money) -> Result<Self, ValidationError> {
        if from == to {
            return Err(ValidationError::SameAccount);
        }
        if amount.is_zero() || amount.is_negative() {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(Self { from, to, amount })
    }

    #[inline]
    pub fn from(&self) -> AccountId {
        self.from
    }

    #[inline]
    pub fn to(&self) -> AccountId {
        self.to
    }

    /// Amount in the source account's currency, always positive
    #[inline]
    pub fn amount(&self) -> Money {
        self.amount
    }
}
