//! Fixed-point money. Amounts are `rust_decimal::Decimal`, never binary
//! floating point, and rounding is always half-up to two fraction digits.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::MONEY_SCALE;
use crate::error::LedgerError;

/// Three-letter uppercase ISO-4217 currency code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, LedgerError> {
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(LedgerError::InvalidCurrency(code.to_string()));
        }
        Ok(Currency(code.to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Money { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Money {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Half-up rounding to [`MONEY_SCALE`] fraction digits.
    pub fn rounded(&self) -> Money {
        Money {
            amount: self
                .amount
                .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero),
            currency: self.currency.clone(),
        }
    }

    pub fn neg(&self) -> Money {
        Money {
            amount: -self.amount,
            currency: self.currency.clone(),
        }
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, LedgerError> {
        self.ensure_same_currency(other)?;
        Ok(Money {
            amount: self.amount + other.amount,
            currency: self.currency.clone(),
        })
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, LedgerError> {
        self.ensure_same_currency(other)?;
        Ok(Money {
            amount: self.amount - other.amount,
            currency: self.currency.clone(),
        })
    }

    /// `self * num / den`, rounded half-up. Rounding happens here, at the
    /// point of allocation.
    pub fn ratio(&self, num: Decimal, den: Decimal) -> Result<Money, LedgerError> {
        if den.is_zero() {
            return Err(LedgerError::NonPositiveAmount(den));
        }
        Ok(Money {
            amount: self.amount * num / den,
            currency: self.currency.clone(),
        }
        .rounded())
    }

    /// `self / count`, rounded half-up.
    pub fn div(&self, count: usize) -> Result<Money, LedgerError> {
        self.ratio(Decimal::ONE, Decimal::from(count))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), LedgerError> {
        if self.currency != other.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.currency.clone(),
                actual: other.currency.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
