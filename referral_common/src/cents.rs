use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "usd";

//--------------------------------------        Cents        ---------------------------------------------------------
/// A monetary amount in the minor unit of its currency (e.g. cents for USD). Reward amounts and transfers are always
/// expressed in minor units, which is also what payment providers expect on the wire.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self).map_err(|_| CentsConversionError(format!("{value} is too large")))
    }
}

impl FromStr for Cents {
    type Err = CentsConversionError;

    /// Parses an amount given in minor units, e.g. "5000" is 50.00.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<i64>().map_err(|e| CentsConversionError(format!("'{s}'. {e}")))?;
        if value < 0 {
            return Err(CentsConversionError(format!("'{s}' is negative")));
        }
        Ok(Self(value))
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Cents::from(5000).to_string(), "50.00");
        assert_eq!(Cents::from(7).to_string(), "0.07");
        assert_eq!(Cents::from(-1250).to_string(), "-12.50");
        assert_eq!(Cents::from_major(3).to_string(), "3.00");
    }

    #[test]
    fn parse() {
        assert_eq!("2500".parse::<Cents>(), Ok(Cents::from(2500)));
        assert!("-1".parse::<Cents>().is_err());
        assert!("12.50".parse::<Cents>().is_err());
    }

    #[test]
    fn arithmetic() {
        let mut total = Cents::from(100) + Cents::from(250);
        total += Cents::from(50);
        assert_eq!(total, Cents::from(400));
        assert_eq!(total - Cents::from(400), Cents::default());
        let sum: Cents = vec![Cents::from(1), Cents::from(2), Cents::from(3)].into_iter().sum();
        assert_eq!(sum, Cents::from(6));
    }
}
