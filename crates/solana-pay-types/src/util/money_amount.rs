//! Human-readable payment amount parsing.
//!
//! This module provides [`MoneyAmount`], a non-negative decimal used as the
//! amount of a payment request. It preserves the precision of its input,
//! which matters when the amount is later converted to base units of a
//! coin or token with a fixed number of decimal places.
//!
//! # Supported Formats
//!
//! Only plain fixed-point numbers are accepted: `"100"`, `"0.01"`, `"1.50"`.
//! Signs, exponents, currency symbols and thousand separators are rejected,
//! since the same parser reads the `amount` parameter of payment URLs.
//!
//! # Example
//!
//! ```rust
//! use solana_pay_types::util::money_amount::MoneyAmount;
//!
//! let amount = MoneyAmount::parse("10.50").unwrap();
//! assert_eq!(amount.scale(), 2);
//! assert_eq!(amount.mantissa(), 1050);
//! assert_eq!(amount.to_string(), "10.5");
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use crate::units;
use crate::units::UnitsError;

/// A parsed, non-negative payment amount with decimal precision.
///
/// The [`scale`](MoneyAmount::scale) method returns the number of decimal places
/// of the input and [`mantissa`](MoneyAmount::mantissa) the value as an integer.
/// For example, `"10.50"` has scale 2 and mantissa 1050.
///
/// Equality is numeric: `1.5` and `1.50` are the same amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MoneyAmount(Decimal);

impl MoneyAmount {
    /// Wraps a decimal, rejecting negative values.
    pub fn new(value: Decimal) -> Result<Self, UnitsError> {
        if value < Decimal::ZERO {
            return Err(UnitsError::Negative);
        }
        Ok(Self(value))
    }

    /// Parses a plain fixed-point string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a plain number or is negative.
    pub fn parse(input: &str) -> Result<Self, UnitsError> {
        units::parse_amount(input).map(Self)
    }

    /// Returns the underlying decimal.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns the number of decimal places in the original input.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    /// Returns the value as an unsigned integer (without decimal point).
    pub fn mantissa(&self) -> u128 {
        self.0.mantissa().unsigned_abs()
    }

    /// Converts the amount to integer base units of an asset with `decimals` places.
    pub fn to_units(&self, decimals: u8) -> Result<u64, UnitsError> {
        units::decimal_to_units(self.0, decimals)
    }

    /// Builds an amount from integer base units of an asset with `decimals` places.
    pub fn from_units(value: u64, decimals: u8) -> Result<Self, UnitsError> {
        units::units_to_decimal(value, decimals).map(Self)
    }

    /// Fails if the amount carries more fractional digits than `decimals`.
    pub fn check_precision(&self, decimals: u8) -> Result<(), UnitsError> {
        units::check_precision(self.0, decimals)
    }
}

impl FromStr for MoneyAmount {
    type Err = UnitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl TryFrom<&str> for MoneyAmount {
    type Error = UnitsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        MoneyAmount::from_str(value)
    }
}

impl TryFrom<Decimal> for MoneyAmount {
    type Error = UnitsError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        MoneyAmount::new(value)
    }
}

impl From<u64> for MoneyAmount {
    fn from(value: u64) -> Self {
        MoneyAmount(Decimal::from(value))
    }
}

impl From<MoneyAmount> for Decimal {
    fn from(value: MoneyAmount) -> Self {
        value.0
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&units::normalize_amount(self.0))
    }
}

impl Serialize for MoneyAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MoneyAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MoneyAmount::parse(&s).map_err(serde::de::Error::custom)
    }
}
