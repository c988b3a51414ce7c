use std::{fmt::Display, iter::Sum, ops::Add};

use serde::{Deserialize, Serialize};
use sqlx::Type;

/// A monetary amount in minor currency units (cents). Offers and parcel declared values are
/// always stored and compared in this representation; the display layer decides on a currency
/// symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Builds an amount from whole currency units.
    pub fn from_units(units: i64) -> Self {
        Self(units * 100)
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

/// Addition saturates at `i64::MAX` instead of wrapping.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::default(), |acc, m| acc + m)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.0 as f64 / 100.0;
        write!(f, "{units:0.2}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn totals_and_display() {
        let a = Money::from_units(12) + Money::from(34);
        assert_eq!(a.value(), 1234);
        assert_eq!(a.to_string(), "12.34");
        let total: Money = [Money::from(1), Money::from(2), Money::from(3)].into_iter().sum();
        assert_eq!(total, Money::from(6));
    }

    #[test]
    fn aggregation_saturates() {
        let total = Money::from(i64::MAX) + Money::from(1);
        assert_eq!(total.value(), i64::MAX);
    }
}
