use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A monetary amount fixed to two decimal places.
/// Negative values are outflows, positive values are inflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).round().to_i64().unwrap_or(0)
    }

    /// Rounds to two decimal places on entry so every `Money` compares
    /// and hashes consistently.
    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn from_cents_round_trip() {
        assert_eq!(Money::from_cents(123456).to_cents(), 123456);
        assert_eq!(Money::from_cents(-29392).to_cents(), -29392);
    }

    #[test]
    fn from_decimal_rounds_to_two_places() {
        let m = Money::from_decimal(Decimal::from_str("1.005").unwrap());
        assert_eq!(m.to_cents(), 100); // banker's rounding
        let m = Money::from_decimal(Decimal::from_str("849.00").unwrap());
        assert_eq!(m.to_cents(), 84900);
    }

    #[test]
    fn display_two_decimals_no_symbol() {
        assert_eq!(Money::from_cents(84900).to_string(), "849.00");
        assert_eq!(Money::from_cents(-29392).to_string(), "-293.92");
    }

    #[test]
    fn abs_and_sign() {
        let debit = Money::from_cents(-500);
        assert!(debit.is_negative());
        assert_eq!(debit.abs(), Money::from_cents(500));
        assert!(!Money::zero().is_negative());
    }

    #[test]
    fn equal_amounts_hash_equal() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Money::from_decimal(Decimal::from_str("12.50").unwrap()));
        assert!(set.contains(&Money::from_cents(1250)));
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).to_cents(), 1250);
        assert_eq!((a - b).to_cents(), 750);
        assert_eq!((-a).to_cents(), -1000);
    }
}
