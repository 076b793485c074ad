//! Exact conversion between human decimal amounts and token base units.
//!
//! All arithmetic is done on the decimal digits and `U256`; no floating point
//! is involved at any step.

use alloy::primitives::U256;
use thiserror::Error;

/// Reasons a human amount cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a decimal number")]
    Malformed(String),

    #[error("amount has more than {max} fractional digits")]
    TooManyDecimals { max: u8 },

    #[error("amount must be greater than zero")]
    NotPositive,

    #[error("amount does not fit in 256 bits")]
    Overflow,
}

/// Scale `amount` by `10^decimals`, e.g. `"1.23"` at 18 decimals is
/// `1230000000000000000`.
///
/// Accepts `"12"`, `"12.5"`, `".5"` and `"12."`. Signs, exponents, separators
/// and more fractional digits than `decimals` are rejected.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::Malformed(amount.to_string()));
    }

    if fraction.len() > decimals as usize {
        return Err(AmountError::TooManyDecimals { max: decimals });
    }

    let padding = decimals as usize - fraction.len();
    let ten = U256::from(10u8);
    let mut value = U256::ZERO;

    for digit in whole.bytes().chain(fraction.bytes()) {
        value = value
            .checked_mul(ten)
            .and_then(|v| v.checked_add(U256::from(digit - b'0')))
            .ok_or(AmountError::Overflow)?;
    }
    for _ in 0..padding {
        value = value.checked_mul(ten).ok_or(AmountError::Overflow)?;
    }

    if value.is_zero() {
        return Err(AmountError::NotPositive);
    }
    Ok(value)
}

/// Render base units as a human decimal string.
///
/// Trailing fractional zeros are dropped but one fractional digit is always
/// kept, so `10^18` at 18 decimals renders as `"1.0"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    if decimals == 0 {
        return digits;
    }

    let decimals = decimals as usize;
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };

    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, fraction)
    }
}
