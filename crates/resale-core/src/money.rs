//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units                                      │
//! │    Every amount is stored in the smallest denomination (paise, cents)  │
//! │    Settlement sums are exact; discounts always round DOWN              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Safe Integer Ceiling
//! Amounts cross a JSON boundary to clients that read numbers as doubles, so
//! every aggregate is capped at `MAX_SAFE_MINOR_UNITS` (2^53 - 1). Sums above
//! it are rejected with [`CoreError::AmountOverflow`], never wrapped.
//!
//! ## Usage
//! ```rust
//! use resale_core::money::Money;
//!
//! let paid = Money::from_minor(150_000);
//! let total = Money::from_minor(200_000);
//! let due = total - paid;
//! assert_eq!(due.minor(), 50_000);
//!
//! let sum = Money::checked_sum([paid, due]).unwrap();
//! assert_eq!(sum, total);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Largest integer exactly representable by an IEEE-754 double.
pub const MAX_SAFE_MINOR_UNITS: i64 = 9_007_199_254_740_991;

/// Basis points in one whole (100.00%).
pub const BPS_DENOMINATOR: i64 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: dues go negative on overpayment and are never clamped
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Currency-agnostic**: the currency code lives on `Amounts`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    ///
    /// ```rust
    /// use resale_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1099).major(), 10);
    /// assert_eq!(Money::from_minor(-550).major(), -5);
    /// ```
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checks that the magnitude fits within `MAX_SAFE_MINOR_UNITS`.
    #[inline]
    pub const fn is_safe(&self) -> bool {
        self.0 >= -MAX_SAFE_MINOR_UNITS && self.0 <= MAX_SAFE_MINOR_UNITS
    }

    /// Adds two amounts, failing instead of leaving the safe integer range.
    ///
    /// ```rust
    /// use resale_core::money::{Money, MAX_SAFE_MINOR_UNITS};
    ///
    /// let near_limit = Money::from_minor(MAX_SAFE_MINOR_UNITS);
    /// assert!(near_limit.checked_add(Money::from_minor(1)).is_err());
    /// ```
    pub fn checked_add(self, other: Money) -> CoreResult<Money> {
        let sum = self
            .0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| CoreError::overflow("money addition"))?;

        if !sum.is_safe() {
            return Err(CoreError::overflow("money addition"));
        }

        Ok(sum)
    }

    /// Sums amounts with overflow checking on every step.
    pub fn checked_sum<I>(amounts: I) -> CoreResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Computes `floor(amount * bps / 10000)`.
    ///
    /// Uses i128 so the intermediate product cannot overflow. Rounding is
    /// always toward negative infinity, so a discount never exceeds what the
    /// rate entitles.
    ///
    /// ```rust
    /// use resale_core::money::Money;
    ///
    /// // 15.00% of 2000.00
    /// assert_eq!(Money::from_minor(200_000).percentage_of_bps(1500).minor(), 30_000);
    /// // 33.33% of 0.10 = 0.033.. → 0.03
    /// assert_eq!(Money::from_minor(10).percentage_of_bps(3333).minor(), 3);
    /// ```
    pub fn percentage_of_bps(&self, bps: i64) -> Money {
        let product = self.0 as i128 * bps as i128;
        let share = product.div_euclid(BPS_DENOMINATOR as i128);
        Money(share.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount as `major.minor`; the currency code is rendered by the caller.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
