//! Fixed-point money in minor currency units
//!
//! Every monetary value in the claims system is an integer number of cents.
//! Percentages are applied with integer arithmetic and truncate toward zero,
//! so payout math never depends on a rounding mode.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Number of minor units in one major unit
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Errors that can occur during money operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount '{0}' does not have exactly two digits after the decimal point")]
    InvalidFractionDigits(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount in minor units (cents)
///
/// Serializes as the raw integer so stored and transmitted values are exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates Money from an integer amount in minor units
    pub const fn from_minor(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Creates a zero amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies an integer percentage, truncating toward zero
    ///
    /// ```rust
    /// use core_kernel::Money;
    ///
    /// assert_eq!(Money::from_minor(999).percent(95), Money::from_minor(949));
    /// ```
    pub fn percent(&self, percentage: u32) -> Self {
        let scaled = i128::from(self.0) * i128::from(percentage) / 100;
        Self(scaled as i64)
    }

    /// Caps the amount at `limit`
    pub fn capped_at(&self, limit: Money) -> Self {
        if self.0 > limit.0 {
            limit
        } else {
            *self
        }
    }

    /// Checked addition
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Parses the legacy fixed-point form `"<int>.<dd>"`
    ///
    /// An empty string is zero. Anything other than exactly one decimal point
    /// followed by exactly two digits is rejected.
    pub fn parse_fixed_point(s: &str) -> Result<Self, MoneyError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::zero());
        }

        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let mut parts = unsigned.split('.');
        let (int_part, frac_part) = match (parts.next(), parts.next(), parts.next()) {
            (Some(int_part), Some(frac_part), None) => (int_part, frac_part),
            _ => return Err(MoneyError::InvalidAmount(s.to_string())),
        };

        if frac_part.len() != 2 {
            return Err(MoneyError::InvalidFractionDigits(s.to_string()));
        }
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(MoneyError::InvalidAmount(s.to_string()));
        }

        let whole: i64 = int_part
            .parse()
            .map_err(|_| MoneyError::InvalidAmount(s.to_string()))?;
        let cents: i64 = frac_part
            .parse()
            .map_err(|_| MoneyError::InvalidAmount(s.to_string()))?;

        let minor = whole
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|m| m.checked_add(cents))
            .ok_or(MoneyError::Overflow)?;

        Ok(Self(if negative { -minor } else { minor }))
    }

    /// Returns the amount in major units as a two-place decimal
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Converts a major-unit decimal with at most two fractional digits
    pub fn try_from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.scale() > 2 && amount.normalize().scale() > 2 {
            return Err(MoneyError::InvalidFractionDigits(amount.to_string()));
        }
        let mut scaled = amount;
        scaled.rescale(2);
        i64::try_from(scaled.mantissa())
            .map(Self)
            .map_err(|_| MoneyError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_major = MINOR_UNITS_PER_MAJOR as u64;
        write!(f, "{}{}.{:02}", sign, abs / per_major, abs % per_major)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_fixed_point(s)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.checked_add(&other).expect("Overflow in Money::add")
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.checked_sub(&other).expect("Overflow in Money::sub")
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn display_then_parse_is_identity(minor in -1_000_000_000i64..1_000_000_000i64) {
            let money = Money::from_minor(minor);
            prop_assert_eq!(money.to_string().parse::<Money>(), Ok(money));
        }

        #[test]
        fn percent_never_exceeds_original(minor in 0i64..1_000_000_000i64, pct in 0u32..=100u32) {
            let money = Money::from_minor(minor);
            prop_assert!(money.percent(pct) <= money);
        }
    }
}
