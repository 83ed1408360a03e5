//! Human-readable money amounts and token unit conversion.
//!
//! Payments are requested in human units (`0.01` USDC) but authorized in the
//! token's smallest unit (`10000` for a 6-decimal token). [`MoneyAmount`] parses
//! the former and converts to a [`TokenAmount`]; [`format_units`] goes back.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use alloy_primitives::U256;
use regex::Regex;
use rust_decimal::Decimal;

use crate::proto::TokenAmount;

/// Decimals of USDC on every network this workspace pays on.
pub const USDC_DECIMALS: u8 = 6;

/// A plain decimal with an optional leading `$` and an optional trailing `USDC`.
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?\s*(-?\d+(?:\.\d+)?)\s*(?i:usdc)?$").expect("valid regex")
});

/// A non-negative decimal amount in human units.
///
/// Only a plain decimal is accepted, optionally written as `"$0.50"` or
/// `"0.50 USDC"`. Grouping separators and decimal commas are rejected rather
/// than guessed at: `"0,01"` is an error, not `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MoneyAmount(Decimal);

/// Errors that can occur when parsing or converting a [`MoneyAmount`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyAmountError {
    /// Not a number.
    #[error("invalid amount '{0}'")]
    InvalidFormat(String),
    /// Negative values are not allowed.
    #[error("amount must not be negative")]
    Negative,
    /// The amount is zero.
    #[error("amount must be greater than zero")]
    Zero,
    /// The amount has more decimal places than the token supports.
    #[error("amount has {money} decimal places but the token only has {token}")]
    WrongPrecision {
        /// Decimal places in the amount.
        money: u32,
        /// Decimal places of the token.
        token: u8,
    },
    /// The amount does not fit the token's integer range.
    #[error("amount is too large")]
    Overflow,
}

impl MoneyAmount {
    /// Parses a human-readable amount.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyAmountError`] if the input is not a number or is negative.
    pub fn parse(input: &str) -> Result<Self, MoneyAmountError> {
        let invalid = || MoneyAmountError::InvalidFormat(input.to_owned());
        let digits = AMOUNT
            .captures(input.trim())
            .and_then(|c| c.get(1))
            .ok_or_else(invalid)?;
        let value = Decimal::from_str(digits.as_str()).map_err(|_| invalid())?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyAmountError::Negative);
        }
        Ok(Self(value.normalize()))
    }

    /// Like [`parse`](Self::parse), but also rejects zero.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyAmountError`] if the input is not a positive number.
    pub fn parse_positive(input: &str) -> Result<Self, MoneyAmountError> {
        let amount = Self::parse(input)?;
        if amount.0.is_zero() {
            return Err(MoneyAmountError::Zero);
        }
        Ok(amount)
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Converts to the token's smallest unit.
    ///
    /// # Errors
    ///
    /// Fails if the amount has more decimal places than `decimals`, or does not
    /// fit.
    pub fn to_token_units(&self, decimals: u8) -> Result<TokenAmount, MoneyAmountError> {
        let scale = self.0.scale();
        if scale > u32::from(decimals) {
            return Err(MoneyAmountError::WrongPrecision {
                money: scale,
                token: decimals,
            });
        }
        let mantissa = self.0.mantissa().unsigned_abs();
        let factor = U256::from(10u8)
            .checked_pow(U256::from(u32::from(decimals) - scale))
            .ok_or(MoneyAmountError::Overflow)?;
        U256::from(mantissa)
            .checked_mul(factor)
            .map(TokenAmount)
            .ok_or(MoneyAmountError::Overflow)
    }
}

impl From<Decimal> for MoneyAmount {
    fn from(value: Decimal) -> Self {
        Self(value.abs().normalize())
    }
}

impl FromStr for MoneyAmount {
    type Err = MoneyAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts a smallest-unit amount to human units.
///
/// Returns `None` if the value does not fit a [`Decimal`].
#[must_use]
pub fn format_units(amount: TokenAmount, decimals: u8) -> Option<MoneyAmount> {
    let raw = i128::try_from(amount.0).ok()?;
    Decimal::try_from_i128_with_scale(raw, u32::from(decimals))
        .ok()
        .map(|d| MoneyAmount(d.normalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_dollar_and_unit() {
        assert_eq!(MoneyAmount::parse("$1000.50").unwrap().to_string(), "1000.5");
        assert_eq!(MoneyAmount::parse(" 0.01 ").unwrap().to_string(), "0.01");
        assert_eq!(MoneyAmount::parse("0.25 USDC").unwrap().to_string(), "0.25");
        assert_eq!(MoneyAmount::parse("$ 2usdc").unwrap().to_string(), "2");
    }

    #[test]
    fn test_parse_rejects_separators() {
        for input in ["0,01", "1,000", "$1,000.50", "1_000", "1.2.3", "1e3", "0.01 EUR", "", "."] {
            assert_eq!(
                MoneyAmount::parse(input),
                Err(MoneyAmountError::InvalidFormat(input.to_owned())),
                "{input}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_garbage_and_negatives() {
        assert!(matches!(
            MoneyAmount::parse("abc"),
            Err(MoneyAmountError::InvalidFormat(_))
        ));
        assert_eq!(MoneyAmount::parse("-1"), Err(MoneyAmountError::Negative));
        assert_eq!(
            MoneyAmount::parse_positive("0.00"),
            Err(MoneyAmountError::Zero)
        );
    }

    #[test]
    fn test_to_token_units() {
        let cent = MoneyAmount::parse("0.01").unwrap();
        assert_eq!(
            cent.to_token_units(USDC_DECIMALS).unwrap(),
            TokenAmount::from(10_000u64)
        );
        let whole = MoneyAmount::parse("3").unwrap();
        assert_eq!(
            whole.to_token_units(USDC_DECIMALS).unwrap(),
            TokenAmount::from(3_000_000u64)
        );
    }

    #[test]
    fn test_to_token_units_rejects_excess_precision() {
        let tiny = MoneyAmount::parse("0.0000001").unwrap();
        assert_eq!(
            tiny.to_token_units(USDC_DECIMALS),
            Err(MoneyAmountError::WrongPrecision { money: 7, token: 6 })
        );
    }

    #[test]
    fn test_format_units() {
        let amount = format_units(TokenAmount::from(10_000u64), USDC_DECIMALS).unwrap();
        assert_eq!(amount.to_string(), "0.01");
        let amount = format_units(TokenAmount::from(1_250_000u64), USDC_DECIMALS).unwrap();
        assert_eq!(amount.to_string(), "1.25");
        assert!(format_units(TokenAmount(U256::MAX), USDC_DECIMALS).is_none());
    }
}
