//! # Calendar Arithmetic
//!
//! Month arithmetic for validity and warranty expiry dates.
//!
//! ## Clamping Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "Same day-of-month N months later, clamped to the month's last day"   │
//! │                                                                         │
//! │  2024-01-31 + 1 month  → 2024-02-29   (leap year, clamped)             │
//! │  2023-01-31 + 1 month  → 2023-02-28   (clamped)                        │
//! │  2024-03-31 + 1 month  → 2024-04-30   (clamped)                        │
//! │  2024-01-15 + 13 months→ 2025-02-15   (year rollover)                  │
//! │                                                                         │
//! │  NEVER: 2024-01-31 + 1 month → 2024-03-02 (day overflow roll-forward)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The day is clamped here explicitly rather than delegated to a library
//! helper, so the rule holds regardless of chrono's own conventions.

use chrono::{Datelike, NaiveDate};

use crate::error::{CoreError, CoreResult};

/// Returns true for Gregorian leap years.
pub const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`.
///
/// ```rust
/// use resale_core::calendar::days_in_month;
///
/// assert_eq!(days_in_month(2024, 2), 29);
/// assert_eq!(days_in_month(2023, 2), 28);
/// assert_eq!(days_in_month(2023, 11), 30);
/// ```
pub const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Advances `date` by `months` calendar months, clamping the day.
///
/// ```rust
/// use chrono::NaiveDate;
/// use resale_core::calendar::add_months;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
/// let end = add_months(start, 1).unwrap();
/// assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
/// ```
pub fn add_months(date: NaiveDate, months: u32) -> CoreResult<NaiveDate> {
    let out_of_range = || CoreError::DateOutOfRange(format!("{date} + {months} months"));

    // Months since year 0, zero-based, in i64 so large inputs cannot wrap.
    let absolute = date.year() as i64 * 12 + date.month0() as i64 + months as i64;
    let year = i32::try_from(absolute.div_euclid(12)).map_err(|_| out_of_range())?;
    let month = absolute.rem_euclid(12) as u32 + 1;

    let day = date.day().min(days_in_month(year, month));

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(out_of_range)
}

// =============================================================================
// Unit Tests
// =============================================================================
