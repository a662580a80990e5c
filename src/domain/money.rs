//! Lossless numeric types for currency amounts and stock quantities.
//!
//! Backed by rust_decimal to avoid floating-point drift. `Money` carries two
//! fractional digits (currency), `Qty` three (stock units like kg or litres).

use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency amount with 2 fractional digits.
///
/// Serializes to a JSON number. Stored in the database as a canonical string.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Money {
    pub fn new(value: RustDecimal) -> Self {
        Money(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Parse losslessly from a string, then round to 2 decimal places (half-up).
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Money::new)
    }

    /// Format as a fixed 2-decimal string, e.g. "70.00".
    pub fn to_canonical_string(&self) -> String {
        format!("{:.2}", self.0)
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn zero() -> Self {
        Money(RustDecimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_negative()
    }

    /// Multiply by an integer quantity (line totals).
    pub fn times(&self, quantity: i64) -> Money {
        Money::new(self.0 * RustDecimal::from(quantity))
    }

    /// GST portion of this amount at the given percent, rounded half-up to 2dp.
    pub fn gst_portion(&self, percent: Money) -> Money {
        Money::new(self.0 * percent.0 / RustDecimal::ONE_HUNDRED)
    }

    /// Subtract, flooring the result at zero. Discounts never go negative.
    pub fn saturating_sub(&self, rhs: Money) -> Money {
        let diff = self.0 - rhs.0;
        if diff.is_sign_negative() {
            Money::zero()
        } else {
            Money(diff)
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

/// Stock quantity with 3 fractional digits. May be negative in ledger deltas.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Qty(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Qty {
    pub fn new(value: RustDecimal) -> Self {
        Qty(value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Parse losslessly from a string, then round to 3 decimal places.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Qty::new)
    }

    /// Format as a fixed 3-decimal string, e.g. "5.000".
    pub fn to_canonical_string(&self) -> String {
        format!("{:.3}", self.0)
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn zero() -> Self {
        Qty(RustDecimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_negative()
    }

    /// Scale by an integer quantity (recipe qty per unit × units sold).
    pub fn times(&self, quantity: i64) -> Qty {
        Qty(self.0 * RustDecimal::from(quantity))
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Qty {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl std::ops::Add for Qty {
    type Output = Qty;

    fn add(self, rhs: Qty) -> Qty {
        Qty(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Qty {
    type Output = Qty;

    fn sub(self, rhs: Qty) -> Qty {
        Qty(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Qty {
    type Output = Qty;

    fn neg(self) -> Qty {
        Qty(-self.0)
    }
}
