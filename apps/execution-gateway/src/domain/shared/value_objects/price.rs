//! Price value object for order limit/stop prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::domain::shared::DomainError;

/// A price level attached to an order.
///
/// Two prices compare equal only when their decimal values are equal, which
/// is what the modify cache relies on to match a confirmation to its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price from a Decimal.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create a Price from an integer mantissa and scale (`10050, 2` is `100.50`).
    #[must_use]
    pub fn from_parts(mantissa: i64, scale: u32) -> Self {
        Self(Decimal::new(mantissa, scale))
    }

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if this price is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Check the price is usable on an order.
    ///
    /// # Errors
    ///
    /// Returns error if the price is zero or negative.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if !self.is_positive() {
            return Err(DomainError::InvalidValue {
                field: "price".to_string(),
                message: format!("Order price must be positive, got {}", self.0),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Price {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_display_normalizes_trailing_zeros() {
        let p = Price::new(Decimal::new(10050, 2));
        assert_eq!(format!("{p}"), "100.5");
        assert_eq!(format!("{}", Price::from(101)), "101");
    }

    #[test]
    fn price_from_parts() {
        let p = Price::from_parts(10050, 2);
        assert_eq!(p.value(), Decimal::new(10050, 2));
    }

    #[test]
    fn price_equality_ignores_scale() {
        assert_eq!(Price::new(Decimal::new(1010, 1)), Price::from(101));
    }

    #[test]
    fn price_validation_rejects_non_positive() {
        assert!(Price::from(0).validate_for_order().is_err());
        assert!(Price::from(-1).validate_for_order().is_err());
        assert!(Price::from(1).validate_for_order().is_ok());
    }

    #[test]
    fn price_ordering() {
        assert!(Price::from(100) < Price::from(101));
    }
}
