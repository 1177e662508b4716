//! Compliance-balance quantity type.
//!
//! # Motivation
//!
//! Every compliance balance in this system is an amount of grams
//! CO₂-equivalent and is computed with exact base-10 arithmetic
//! ([`rust_decimal::Decimal`]). Passing raw `Decimal`s around invites mixing
//! a balance with an unrelated decimal (an intensity in gCO₂e/MJ, an energy
//! in MJ, a tonnage) without any compile-time signal.
//!
//! `Gco2e` wraps the raw `Decimal` so the type system prevents:
//! - Implicit construction from a raw decimal (no `From<Decimal>` impl).
//! - Adding a balance to an intensity or an energy figure.
//!
//! # Arithmetic
//!
//! - `Add`, `Sub`, `Neg`, `AddAssign`, `SubAssign` and `Sum` are closed over
//!   `Gco2e` and follow `Decimal`'s own operators. Use them only on values
//!   of known magnitude.
//! - `checked_add` / `checked_sub` / [`Gco2e::checked_sum`]: overflow-aware
//!   forms returning `None`. Every figure derived from route or ledger input
//!   goes through these.
//! - [`Gco2e::from_intensity_gap`] is the single place where an intensity
//!   gap (gCO₂e/MJ) is scaled by an energy figure (MJ) into a balance. It is
//!   checked as well.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Gco2e newtype
// ---------------------------------------------------------------------------

/// A signed amount of grams CO₂-equivalent.
///
/// Positive values are surplus, negative values are deficit.
///
/// # Construction
///
/// Use [`Gco2e::new`] for explicit construction. There is intentionally no
/// `From<Decimal>` implementation; callers must be deliberate about when a
/// raw decimal represents a compliance balance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gco2e(Decimal);

impl Gco2e {
    /// Zero balance.
    pub const ZERO: Gco2e = Gco2e(Decimal::ZERO);

    /// Construct from a raw decimal amount of gCO₂e.
    #[inline]
    pub const fn new(raw: Decimal) -> Self {
        Gco2e(raw)
    }

    /// Extract the underlying decimal for storage or display layers.
    #[inline]
    pub const fn raw(self) -> Decimal {
        self.0
    }

    /// `(target − actual) × energy`, the compliance-balance formula.
    ///
    /// `target` and `actual` are intensities in gCO₂e/MJ, `energy_mj` is the
    /// energy in scope in MJ.
    ///
    /// Returns `None` if either step overflows `Decimal`. Callers MUST map
    /// that to an explicit error; a balance is never clamped.
    #[inline]
    pub fn from_intensity_gap(
        target: Decimal,
        actual: Decimal,
        energy_mj: Decimal,
    ) -> Option<Gco2e> {
        target
            .checked_sub(actual)?
            .checked_mul(energy_mj)
            .map(Gco2e)
    }

    #[inline]
    pub fn checked_add(self, rhs: Gco2e) -> Option<Gco2e> {
        self.0.checked_add(rhs.0).map(Gco2e)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Gco2e) -> Option<Gco2e> {
        self.0.checked_sub(rhs.0).map(Gco2e)
    }

    /// Sum that stops at the first overflow.
    pub fn checked_sum<I: IntoIterator<Item = Gco2e>>(iter: I) -> Option<Gco2e> {
        iter.into_iter()
            .try_fold(Gco2e::ZERO, |acc, x| acc.checked_add(x))
    }

    /// `true` if strictly greater than zero (a surplus).
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// `true` if strictly less than zero (a deficit).
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `true` if zero or positive.
    #[inline]
    pub fn is_non_negative(self) -> bool {
        self.0 >= Decimal::ZERO
    }

    /// Absolute value.
    #[inline]
    pub fn abs(self) -> Gco2e {
        Gco2e(self.0.abs())
    }
}

// ---------------------------------------------------------------------------
// Arithmetic operators (closed over Gco2e)
// ---------------------------------------------------------------------------

impl Add for Gco2e {
    type Output = Gco2e;
    #[inline]
    fn add(self, rhs: Gco2e) -> Gco2e {
        Gco2e(self.0 + rhs.0)
    }
}

impl Sub for Gco2e {
    type Output = Gco2e;
    #[inline]
    fn sub(self, rhs: Gco2e) -> Gco2e {
        Gco2e(self.0 - rhs.0)
    }
}

impl Neg for Gco2e {
    type Output = Gco2e;
    #[inline]
    fn neg(self) -> Gco2e {
        Gco2e(-self.0)
    }
}

impl AddAssign for Gco2e {
    #[inline]
    fn add_assign(&mut self, rhs: Gco2e) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Gco2e {
    #[inline]
    fn sub_assign(&mut self, rhs: Gco2e) {
        self.0 -= rhs.0;
    }
}

impl Sum for Gco2e {
    fn sum<I: Iterator<Item = Gco2e>>(iter: I) -> Gco2e {
        iter.fold(Gco2e::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Gco2e> for Gco2e {
    fn sum<I: Iterator<Item = &'a Gco2e>>(iter: I) -> Gco2e {
        iter.fold(Gco2e::ZERO, |acc, x| acc + *x)
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl std::fmt::Display for Gco2e {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Trailing zeros carried over from input scales are noise here.
        write!(f, "{}", self.0.normalize())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
