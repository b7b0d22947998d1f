//! Money Module
//!
//! Fixed-point monetary values with exactly two fractional digits.
//! All balance and invoice arithmetic goes through [`Money`].
//!
//! ## Design Principles
//! 1. Fixed scale: every value carries exactly [`SCALE`] fractional digits
//! 2. One rounding rule: half-up (midpoint away from zero), see [`round`]
//! 3. Explicit Error Handling: parsing never truncates silently
//!
//! ## Usage
//! ```rust
//! use simple_billing::money::Money;
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let amount = Money::parse("10.05").unwrap();
//! let converted = amount.convert(Decimal::from_str("1.24").unwrap()).unwrap();
//! assert_eq!(converted.to_string(), "12.46"); // 12.462 rounded half-up
//! ```

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::*;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Number of fractional digits carried by every [`Money`] value
pub const SCALE: u32 = 2;

/// Integer digits that fit a `NUMERIC(20,2)` column
pub const MAX_INTEGER_DIGITS: usize = 18;

// ============================================================================
// Error Types
// ============================================================================

/// Money parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount cannot be negative")]
    Negative,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Rounding
// ============================================================================

/// Round a decimal to [`SCALE`] digits, half-up.
///
/// `12.465 -> 12.47`, `12.464 -> 12.46`, `-0.005 -> -0.01`.
pub fn round(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SCALE);
    rounded
}

// ============================================================================
// Money
// ============================================================================

/// Fixed-point amount with scale 2.
///
/// Maps to `NUMERIC(20,2)` columns. May be negative when it holds the
/// balance of an overdraft account; transfer amounts are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Build from an arbitrary decimal, rounding half-up to two digits
    pub fn from_decimal_rounded(value: Decimal) -> Self {
        Money(round(value))
    }

    /// Build from a decimal that must already fit the scale exactly
    pub fn from_decimal_exact(value: Decimal) -> Result<Self, MoneyError> {
        let normalized = value.normalize();
        if normalized.scale() > SCALE {
            return Err(MoneyError::PrecisionOverflow {
                provided: normalized.scale(),
                max: SCALE,
            });
        }
        Ok(Money(round(normalized)))
    }

    /// Parse a client-supplied, non-negative decimal literal.
    ///
    /// Accepts `10`, `10.5`, `10.05`, `.5` and `5.`. Rejects signs, empty
    /// strings, a lone `.`, more than one separator, more than two fractional
    /// digits and more than [`MAX_INTEGER_DIGITS`] integer digits.
    pub fn parse(text: &str) -> Result<Self, MoneyError> {
        if text.is_empty() {
            return Err(MoneyError::InvalidFormat("empty string".into()));
        }
        if text.starts_with('-') {
            return Err(MoneyError::Negative);
        }

        let parts: Vec<&str> = text.split('.').collect();
        let (whole, frac) = match parts.len() {
            1 => (parts[0], ""),
            2 => (parts[0], parts[1]),
            _ => return Err(MoneyError::InvalidFormat("multiple decimal points".into())),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(MoneyError::InvalidFormat("no digits".into()));
        }

        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(MoneyError::InvalidFormat(format!(
                "non-digit character in '{}'",
                text
            )));
        }

        // No silent truncation of extra digits
        if frac.len() > SCALE as usize {
            return Err(MoneyError::PrecisionOverflow {
                provided: frac.len() as u32,
                max: SCALE,
            });
        }

        let whole = whole.trim_start_matches('0');
        if whole.len() > MAX_INTEGER_DIGITS {
            return Err(MoneyError::Overflow);
        }

        let whole = if whole.is_empty() { "0" } else { whole };
        let literal = if frac.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, frac)
        };
        let value = Decimal::from_str(&literal).map_err(|_| MoneyError::Overflow)?;
        Ok(Money(round(value)))
    }

    /// Inner decimal value (always scale 2)
    #[inline]
    pub fn inner(self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Multiply by an exchange rate and round half-up to two digits
    pub fn convert(self, rate: Decimal) -> Option<Money> {
        self.0.checked_mul(rate).map(Money::from_decimal_rounded)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // String keeps the exact two-digit representation
        serializer.serialize_str(&self.to_string())
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}
