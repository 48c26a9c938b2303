//! Monetary amounts.

use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
///
/// Serialized as a bare integer number of cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Sums amounts, or `None` if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.dollars(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_checked_mul_overflow() {
        assert_eq!(
            Money::from_cents(1999).checked_mul(3),
            Some(Money::from_cents(5997))
        );
        assert_eq!(Money::from_cents(i64::MAX / 2 + 1).checked_mul(2), None);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(49999).to_string(), "$499.99");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_checked_sum() {
        let total = Money::checked_sum([Money::from_cents(2000), Money::from_cents(250)]);
        assert_eq!(total, Some(Money::from_cents(2250)));
        assert_eq!(Money::checked_sum(std::iter::empty()), Some(Money::zero()));

        let overflow = Money::checked_sum([Money::from_cents(i64::MAX), Money::from_cents(1)]);
        assert_eq!(overflow, None);
    }

    #[test]
    fn test_money_serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_cents(5999)).unwrap();
        assert_eq!(json, "5999");
        let back: Money = serde_json::from_str("5999").unwrap();
        assert_eq!(back, Money::from_cents(5999));
    }
}
