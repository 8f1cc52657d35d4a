//! Amount - Non-negative decimal wrapper for balances, rewards and withdrawals
//!
//! All money in TaskPay is held to cent precision and is never negative.
//! Direction (credit vs debit) lives on the ledger entry kind, not the amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of decimal places money is kept at
pub const CENT_SCALE: u32 = 2;

/// Errors that can occur when working with amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Amount has more than 2 decimal places: {0}")]
    TooPrecise(Decimal),
}

/// A non-negative, cent-precision amount.
///
/// # Invariant
/// The inner value is always >= 0 and has at most two decimal places.
///
/// # Example
/// ```
/// use taskpay_core::Amount;
/// use rust_decimal::Decimal;
///
/// let amount = Amount::new(Decimal::new(15050, 2)).unwrap(); // 150.50
/// assert_eq!(amount.value(), Decimal::new(15050, 2));
///
/// assert!(Amount::new(Decimal::new(-1, 0)).is_err());
/// assert!(Amount::new(Decimal::new(1001, 3)).is_err()); // 1.001
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Amount from a Decimal.
    ///
    /// Rejects negative values and values finer than one cent.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::NegativeAmount(value));
        }
        let normalized = value.normalize();
        if normalized.scale() > CENT_SCALE {
            return Err(AmountError::TooPrecise(value));
        }
        Ok(Self(normalized))
    }

    /// Create a strictly positive Amount (ledger entries, rewards, withdrawals).
    pub fn positive(value: Decimal) -> Result<Self, AmountError> {
        let amount = Self::new(value)?;
        if amount.is_zero() {
            return Err(AmountError::ZeroAmount);
        }
        Ok(amount)
    }

    /// Get the inner Decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The smaller of two amounts
    pub fn min(self, other: Amount) -> Amount {
        if self <= other {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::positive(dec!(100)).unwrap();
        assert_eq!(amount.value(), dec!(100));
    }

    #[test]
    fn test_amount_zero_allowed_but_not_positive() {
        assert!(Amount::new(Decimal::ZERO).unwrap().is_zero());
        assert_eq!(Amount::positive(Decimal::ZERO), Err(AmountError::ZeroAmount));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let result = Amount::new(dec!(-100));
        assert!(matches!(result, Err(AmountError::NegativeAmount(_))));
    }

    #[test]
    fn test_sub_cent_precision_rejected() {
        assert!(matches!(
            Amount::new(dec!(99.999)),
            Err(AmountError::TooPrecise(_))
        ));
        // trailing zeros are not extra precision
        assert_eq!(Amount::new(dec!(99.9900)).unwrap().value(), dec!(99.99));
    }

    #[test]
    fn test_min() {
        let a = Amount::new(dec!(50)).unwrap();
        let b = Amount::new(dec!(20.5)).unwrap();
        assert_eq!(a.min(b), b);
        assert_eq!(b.min(a), b);
        assert_eq!(a.min(Amount::ZERO), Amount::ZERO);
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(Amount::new(dec!(150)).unwrap().to_string(), "150.00");
        assert_eq!(Amount::new(dec!(0.5)).unwrap().to_string(), "0.50");
    }

    #[test]
    fn test_serde_rejects_negative() {
        let parsed: Result<Amount, _> = serde_json::from_str("\"-5\"");
        assert!(parsed.is_err());
        let parsed: Amount = serde_json::from_str("\"123.45\"").unwrap();
        assert_eq!(parsed.value(), dec!(123.45));
    }
}
