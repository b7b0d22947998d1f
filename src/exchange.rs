//! Currency Exchange Table
//!
//! Fixed conversion factors between the supported currencies. The table is a
//! 3x3 matrix indexed by [`Currency::index`], derived from per-EUR quotes so
//! that every inverse and cross pair is consistent:
//!
//! ```text
//! rate(from, to) = UNITS_PER_EUR[to] / UNITS_PER_EUR[from]
//! ```
//!
//! The matrix is built once at startup and validated by
//! [`ExchangeTable::validate`]; it is never mutated afterwards.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::core_types::Currency;
use crate::money::Money;

/// EUR -> USD quote
pub const EUR_TO_USD: Decimal = Decimal::from_parts(124, 0, 0, false, 2);

/// EUR -> RUB quote
pub const EUR_TO_RUB: Decimal = Decimal::from_parts(7053, 0, 0, false, 2);

/// Tolerance for inverse/cross consistency checks (division is carried at
/// 28 significant digits)
const CONSISTENCY_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 20);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Rate {from}->{to} must be positive, got {rate}")]
    NonPositiveRate {
        from: Currency,
        to: Currency,
        rate: Decimal,
    },

    #[error("Identity rate for {0} must be exactly 1")]
    IdentityNotOne(Currency),

    #[error("Rates {from}->{to} and {to}->{from} are not inverse")]
    InverseMismatch { from: Currency, to: Currency },

    #[error("Cross rate {from}->{via}->{to} disagrees with {from}->{to}")]
    CrossMismatch {
        from: Currency,
        via: Currency,
        to: Currency,
    },
}

/// Immutable conversion matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeTable {
    rates: [[Decimal; 3]; 3],
}

impl ExchangeTable {
    /// Standard table built from the EUR quotes above
    pub fn standard() -> Self {
        Self::from_eur_quotes([EUR_TO_USD, Decimal::ONE, EUR_TO_RUB])
    }

    /// Build the full matrix from "units of currency per 1 EUR", indexed by
    /// [`Currency::index`].
    pub fn from_eur_quotes(units_per_eur: [Decimal; 3]) -> Self {
        let mut rates = [[Decimal::ONE; 3]; 3];
        for from in Currency::ALL {
            for to in Currency::ALL {
                if from != to {
                    rates[from.index()][to.index()] =
                        units_per_eur[to.index()] / units_per_eur[from.index()];
                }
            }
        }
        Self { rates }
    }

    /// Build from an explicit matrix. Call [`validate`](Self::validate) before use.
    pub fn from_matrix(rates: [[Decimal; 3]; 3]) -> Self {
        Self { rates }
    }

    /// Multiplicative factor converting an amount in `from` into `to`
    #[inline]
    pub fn rate(&self, from: Currency, to: Currency) -> Decimal {
        self.rates[from.index()][to.index()]
    }

    /// Textual lookup, failing for codes outside the enumeration
    pub fn rate_by_code(&self, from: &str, to: &str) -> Result<Decimal, ExchangeError> {
        let from: Currency = from
            .parse()
            .map_err(|_| ExchangeError::UnsupportedCurrency(from.to_string()))?;
        let to: Currency = to
            .parse()
            .map_err(|_| ExchangeError::UnsupportedCurrency(to.to_string()))?;
        Ok(self.rate(from, to))
    }

    /// Convert `amount` from one currency into another, rounded half-up to
    /// two digits. `None` only on decimal overflow.
    pub fn convert(&self, amount: Money, from: Currency, to: Currency) -> Option<Money> {
        if from == to {
            return Some(amount);
        }
        amount.convert(self.rate(from, to))
    }

    /// Check completeness and consistency of the matrix.
    ///
    /// - every entry positive
    /// - identity entries exactly 1
    /// - `rate(a,b) * rate(b,a) == 1` within [`CONSISTENCY_EPSILON`]
    /// - `rate(a,b) * rate(b,c) == rate(a,c)` within the same tolerance
    pub fn validate(&self) -> Result<(), ExchangeError> {
        for from in Currency::ALL {
            for to in Currency::ALL {
                let rate = self.rate(from, to);
                if rate <= Decimal::ZERO {
                    return Err(ExchangeError::NonPositiveRate { from, to, rate });
                }
                if from == to && rate != Decimal::ONE {
                    return Err(ExchangeError::IdentityNotOne(from));
                }
                let roundtrip = rate * self.rate(to, from);
                if (roundtrip - Decimal::ONE).abs() > CONSISTENCY_EPSILON {
                    return Err(ExchangeError::InverseMismatch { from, to });
                }
            }
        }

        for from in Currency::ALL {
            for via in Currency::ALL {
                for to in Currency::ALL {
                    let direct = self.rate(from, to);
                    let chained = self.rate(from, via) * self.rate(via, to);
                    if (direct - chained).abs() > CONSISTENCY_EPSILON * direct.max(Decimal::ONE) {
                        return Err(ExchangeError::CrossMismatch { from, via, to });
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for ExchangeTable {
    fn default() -> Self {
        Self::standard()
    }
}
