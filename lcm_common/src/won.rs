use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const KRW_CURRENCY_CODE: &str = "KRW";

//--------------------------------------         Won          ---------------------------------------------------------
/// An amount of Korean won. Won has no minor unit, so every amount the gateway reports is an exact integer and all
/// comparisons between order totals and paid amounts are exact.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Won(i64);

op!(binary Won, Add, add);
op!(binary Won, Sub, sub);
op!(inplace Won, AddAssign, add_assign);
op!(inplace Won, SubAssign, sub_assign);
op!(unary Won, Neg, neg);

impl Sum for Won {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in won: {0}")]
pub struct WonConversionError(String);

impl From<i64> for Won {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Won {
    type Error = WonConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self).map_err(|_| WonConversionError(format!("{value} is too large")))
    }
}

impl Display for Won {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "₩{}", self.0)
    }
}

impl Won {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Won) -> Option<Won> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Won) -> Option<Won> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Integer percentage of this amount, rounded towards zero. `None` if the result does not fit.
    pub fn checked_percent(self, pct: i64) -> Option<Won> {
        let value = i128::from(self.0) * i128::from(pct) / 100;
        i64::try_from(value).ok().map(Self)
    }

    /// Integer percentage of this amount, rounded towards zero. Saturates at the bounds of the representable range.
    pub fn percent(&self, pct: i64) -> Self {
        let value = i128::from(self.0) * i128::from(pct) / 100;
        Self(value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }
}
