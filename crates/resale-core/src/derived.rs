//! # Derived Fields
//!
//! Stamps the computed expiry dates on a purchase before it is stored.
//!
//! ```text
//! validity.end_date = (validity.start_date ?? purchase_date) + duration_months
//! warranty.end_date = purchase_date + warranty.months   (only if has_warranty)
//! ```
//!
//! Always recomputed from the source fields, never from a previous end date,
//! so running it twice gives the same purchase.

use crate::calendar::add_months;
use crate::error::{CoreResult, ValidationError};
use crate::types::Purchase;

/// Recomputes `validity.end_date` and `warranty.end_date`.
///
/// ## Errors
/// - `duration_months == 0` is rejected as invalid input
/// - date overflow surfaces as `CoreError::DateOutOfRange`
///
/// ## Example
/// ```rust,ignore
/// let purchase = calculate_derived_fields(purchase)?;
/// repo.insert(&purchase).await?;
/// ```
pub fn calculate_derived_fields(mut purchase: Purchase) -> CoreResult<Purchase> {
    purchase.validity.end_date = match purchase.validity.duration_months {
        Some(0) => {
            return Err(ValidationError::OutOfRange {
                field: "validity.duration_months".to_string(),
                min: 1,
                max: u32::MAX as i64,
            }
            .into())
        }
        Some(months) => {
            let start = purchase
                .validity
                .start_date
                .unwrap_or(purchase.purchase_date);
            Some(add_months(start, months)?)
        }
        None => None,
    };

    purchase.warranty.end_date = match (purchase.warranty.has_warranty, purchase.warranty.months) {
        (true, Some(months)) => Some(add_months(purchase.purchase_date, months)?),
        _ => None,
    };

    Ok(purchase)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::fixtures::{purchase, ymd};

    #[test]
    fn test_validity_from_purchase_date_leap_year() {
        let mut p = purchase(ymd(2024, 1, 31));
        p.validity.duration_months = Some(1);

        let p = calculate_derived_fields(p).unwrap();
        assert_eq!(p.validity.end_date, Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn test_validity_from_purchase_date_common_year() {
        let mut p = purchase(ymd(2023, 1, 31));
        p.validity.duration_months = Some(1);

        let p = calculate_derived_fields(p).unwrap();
        assert_eq!(p.validity.end_date, Some(ymd(2023, 2, 28)));
    }

    #[test]
    fn test_validity_prefers_start_date() {
        let mut p = purchase(ymd(2024, 1, 10));
        p.validity.duration_months = Some(12);
        p.validity.start_date = Some(ymd(2024, 3, 1));

        let p = calculate_derived_fields(p).unwrap();
        assert_eq!(p.validity.end_date, Some(ymd(2025, 3, 1)));
    }

    #[test]
    fn test_warranty_only_when_flagged() {
        let mut p = purchase(ymd(2024, 5, 31));
        p.warranty.months = Some(6);

        let p = calculate_derived_fields(p).unwrap();
        assert_eq!(p.warranty.end_date, None);

        let mut p = p;
        p.warranty.has_warranty = true;
        let p = calculate_derived_fields(p).unwrap();
        assert_eq!(p.warranty.end_date, Some(ymd(2024, 11, 30)));
    }

    #[test]
    fn test_zero_warranty_months_is_purchase_date() {
        let mut p = purchase(ymd(2024, 5, 31));
        p.warranty.has_warranty = true;
        p.warranty.months = Some(0);

        let p = calculate_derived_fields(p).unwrap();
        assert_eq!(p.warranty.end_date, Some(ymd(2024, 5, 31)));
    }

    #[test]
    fn test_absent_durations_leave_dates_unset() {
        let mut p = purchase(ymd(2024, 5, 31));
        p.validity.end_date = Some(ymd(1999, 1, 1));
        p.warranty.has_warranty = true;
        p.warranty.end_date = Some(ymd(1999, 1, 1));

        let p = calculate_derived_fields(p).unwrap();
        assert_eq!(p.validity.end_date, None);
        assert_eq!(p.warranty.end_date, None);
    }

    #[test]
    fn test_idempotent() {
        let mut p = purchase(ymd(2024, 1, 31));
        p.validity.duration_months = Some(1);
        p.warranty.has_warranty = true;
        p.warranty.months = Some(3);

        let once = calculate_derived_fields(p).unwrap();
        let twice = calculate_derived_fields(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut p = purchase(ymd(2024, 1, 31));
        p.validity.duration_months = Some(0);

        let result = calculate_derived_fields(p);
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }
}
