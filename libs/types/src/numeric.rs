//! Fixed-point numeric types for prices and quantities
//!
//! Prices use rust_decimal for exact comparison and ordering; floating
//! point never enters price arithmetic. Quantities are whole units, so
//! they are plain integers under a validated newtype.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Limit or execution price
///
/// Always positive, with at most [`Price::SCALE`] fractional digits.
/// Serialized as a string to prevent JSON number precision loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of fractional digits accepted at the boundary.
    pub const SCALE: u32 = 4;

    /// Create a new Price from a Decimal
    ///
    /// # Panics
    /// Panics if the price is not positive or carries more than
    /// [`Price::SCALE`] fractional digits
    pub fn new(value: Decimal) -> Self {
        Self::try_new(value).expect("invalid price")
    }

    /// Try to create a Price, returning None if invalid
    ///
    /// Values finer than the fixed scale are rejected rather than rounded,
    /// so an order never executes at a price the client did not send.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value <= Decimal::ZERO {
            return None;
        }
        let normalized = value.normalize();
        if normalized.scale() > Self::SCALE {
            return None;
        }
        Some(Self(normalized))
    }

    /// Create from an integer number of whole currency units
    pub fn from_u64(value: u64) -> Self {
        Self::new(Decimal::from(value))
    }

    /// Parse from a decimal string such as "150.00"
    pub fn parse(s: &str) -> Option<Self> {
        Decimal::from_str(s).ok().and_then(Self::try_new)
    }

    /// Get the inner decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// String serialization preserves precision across JSON round trips.
impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let decimal = Decimal::from_str(&s).map_err(serde::de::Error::custom)?;
        Self::try_new(decimal)
            .ok_or_else(|| serde::de::Error::custom("price must be positive with at most 4 decimals"))
    }
}

/// Order or trade quantity in whole units
///
/// Orders are entered with positive quantities; zero exists only for
/// fill accounting (`filled_quantity` starts at zero).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Create a new Quantity
    ///
    /// # Panics
    /// Panics if the quantity is zero
    pub fn new(value: u64) -> Self {
        Self::try_new(value).expect("quantity must be positive")
    }

    /// Try to create a positive Quantity, returning None for zero
    pub fn try_new(value: u64) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Get the raw unit count
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Smaller of two quantities
    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        assert!(
            self.0 >= rhs.0,
            "quantity subtraction would result in negative"
        );
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_creation() {
        let price = Price::from_u64(150);
        assert_eq!(price.as_decimal(), Decimal::from(150));
    }

    #[test]
    fn test_price_rejects_non_positive() {
        assert!(Price::try_new(Decimal::ZERO).is_none());
        assert!(Price::try_new(Decimal::from(-100)).is_none());
    }

    #[test]
    fn test_price_rejects_excess_scale() {
        assert!(Price::parse("150.0001").is_some());
        assert!(Price::parse("150.00001").is_none());
    }

    #[test]
    fn test_price_trailing_zeros_are_equal() {
        let a = Price::parse("150.00").unwrap();
        let b = Price::parse("150").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_price_ordering_exact() {
        let low = Price::parse("149.9999").unwrap();
        let high = Price::parse("150.0000").unwrap();
        assert!(low < high);
    }

    #[test]
    fn test_price_serialization() {
        let price = Price::parse("150.25").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"150.25\"");

        let deserialized: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(price, deserialized);
    }

    #[test]
    fn test_price_deserialization_rejects_invalid() {
        assert!(serde_json::from_str::<Price>("\"0\"").is_err());
        assert!(serde_json::from_str::<Price>("\"-5\"").is_err());
        assert!(serde_json::from_str::<Price>("\"1.23456\"").is_err());
    }

    #[test]
    fn test_quantity_positive_only() {
        assert!(Quantity::try_new(0).is_none());
        assert_eq!(Quantity::try_new(100).unwrap().as_u64(), 100);
    }

    #[test]
    fn test_quantity_arithmetic() {
        let a = Quantity::new(100);
        let b = Quantity::new(60);
        assert_eq!((a - b).as_u64(), 40);
        assert_eq!((a + b).as_u64(), 160);
        assert_eq!(a.min(b), b);
    }

    #[test]
    #[should_panic(expected = "quantity subtraction would result in negative")]
    fn test_quantity_underflow_panics() {
        let _ = Quantity::new(1) - Quantity::new(2);
    }

    #[test]
    fn test_quantity_serialization_as_number() {
        let qty = Quantity::new(40);
        assert_eq!(serde_json::to_string(&qty).unwrap(), "40");
        let back: Quantity = serde_json::from_str("40").unwrap();
        assert_eq!(back, qty);
    }
}
