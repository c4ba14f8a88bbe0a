//! Conversion between human decimal amounts and integer base units.
//!
//! Coins and tokens declare a number of decimal places (0 to 18). A human
//! amount like `0.01` SOL becomes `10_000_000` lamports because SOL declares
//! [`NATIVE_DECIMALS`] places. The conversions in this module never lose
//! precision silently: the forward direction rounds half away from zero and
//! reports overflow, the reverse direction is exact.

use once_cell::sync::Lazy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places of the native coin (lamports per SOL = 10^9).
pub const NATIVE_DECIMALS: u8 = 9;

/// Largest decimal count a token may declare.
pub const MAX_DECIMALS: u8 = 18;

static AMOUNT_PATTERN: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^\d+(\.\d+)?$").expect("amount pattern is a valid regex")
});

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Invalid amount format: {0:?}")]
    InvalidFormat(String),
    #[error("Amount must not be negative")]
    Negative,
    #[error("Decimals {0} out of range (0..={MAX_DECIMALS})")]
    DecimalsOutOfRange(u8),
    #[error("Amount does not fit into 64-bit base units")]
    Overflow,
    #[error(
        "Amount has {money} fractional digits, which exceeds the {token} decimals of the asset"
    )]
    WrongPrecision { money: u32, token: u8 },
}

fn scale_factor(decimals: u8) -> Result<Decimal, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::DecimalsOutOfRange(decimals));
    }
    Ok(Decimal::from(10u64.pow(decimals as u32)))
}

/// Converts a decimal amount to integer base units.
///
/// The scaled value is rounded half away from zero, so `0.0000000005` SOL
/// becomes 1 lamport.
pub fn decimal_to_units(amount: Decimal, decimals: u8) -> Result<u64, UnitsError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitsError::Negative);
    }
    let factor = scale_factor(decimals)?;
    let scaled = amount
        .checked_mul(factor)
        .ok_or(UnitsError::Overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    scaled.to_u64().ok_or(UnitsError::Overflow)
}

/// Converts integer base units back to an exact decimal amount.
pub fn units_to_decimal(units: u64, decimals: u8) -> Result<Decimal, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::DecimalsOutOfRange(decimals));
    }
    Ok(Decimal::from_i128_with_scale(units as i128, decimals as u32).normalize())
}

/// Rejects amounts with more fractional digits than the asset declares.
///
/// Trailing zeros do not count: `1.500` passes for a 1-decimal asset.
pub fn check_precision(amount: Decimal, decimals: u8) -> Result<(), UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::DecimalsOutOfRange(decimals));
    }
    let money = amount.normalize().scale();
    if money > decimals as u32 {
        return Err(UnitsError::WrongPrecision {
            money,
            token: decimals,
        });
    }
    Ok(())
}

/// Renders the shortest fixed-point form of an amount: `"1.5"`, `"100"`, `"0"`.
pub fn normalize_amount(amount: Decimal) -> String {
    let normalized = amount.normalize();
    if normalized.is_zero() {
        return "0".to_string();
    }
    normalized.to_string()
}

/// Parses a plain non-negative fixed-point number without losing precision.
pub fn parse_amount(input: &str) -> Result<Decimal, UnitsError> {
    let trimmed = input.trim();
    if trimmed.starts_with('-') && AMOUNT_PATTERN.is_match(&trimmed[1..]) {
        return Err(UnitsError::Negative);
    }
    if !AMOUNT_PATTERN.is_match(trimmed) {
        return Err(UnitsError::InvalidFormat(input.to_string()));
    }
    // Digits beyond what a Decimal holds are an error, never rounded away.
    Decimal::from_str_exact(trimmed).map_err(|_| UnitsError::InvalidFormat(input.to_string()))
}
