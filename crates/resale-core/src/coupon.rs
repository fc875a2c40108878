//! # Coupon Engine
//!
//! Validity predicate and discount pricing for coupons.
//!
//! ## Validity Checks (in order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. is_active == false                  → Inactive                     │
//! │  2. max_uses set && used_count ≥ max    → UsageLimitReached            │
//! │  3. valid_from set && now < valid_from  → NotYetValid                  │
//! │  4. valid_to set && now > valid_to      → Expired                      │
//! │  5. scoped to product P, asked for Q≠P  → ProductMismatch              │
//! │  otherwise                              → valid                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pricing
//! - PERCENT: `floor(amount × value_bps / 10000)`
//! - FLAT: `min(value, amount)`
//! - anything else, or an invalid coupon: 0
//!
//! Rounding is always down.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Coupon, DiscountType};

/// Why a coupon was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRejection {
    Inactive,
    UsageLimitReached,
    NotYetValid,
    Expired,
    ProductMismatch,
}

/// Result of [`check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct CouponCheck {
    pub valid: bool,
    pub reason: Option<CouponRejection>,
}

impl CouponCheck {
    fn accepted() -> Self {
        CouponCheck {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: CouponRejection) -> Self {
        CouponCheck {
            valid: false,
            reason: Some(reason),
        }
    }
}

/// Upper-cases and trims a coupon code for storage and lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Checks activity, usage limit and validity window; ignores product scope.
fn rejection_at(coupon: &Coupon, now: DateTime<Utc>) -> Option<CouponRejection> {
    if !coupon.is_active {
        return Some(CouponRejection::Inactive);
    }

    if let Some(max_uses) = coupon.max_uses {
        if coupon.used_count >= max_uses {
            return Some(CouponRejection::UsageLimitReached);
        }
    }

    if matches!(coupon.valid_from, Some(from) if now < from) {
        return Some(CouponRejection::NotYetValid);
    }

    if matches!(coupon.valid_to, Some(to) if now > to) {
        return Some(CouponRejection::Expired);
    }

    None
}

/// True when the coupon may be applied at `now`. Both window bounds are inclusive.
pub fn is_valid(coupon: &Coupon, now: DateTime<Utc>) -> bool {
    rejection_at(coupon, now).is_none()
}

/// Full check including product scope.
///
/// A coupon scoped to a product only rejects when the caller names a
/// different product; a check without product context falls back to
/// [`is_valid`].
pub fn check(coupon: &Coupon, product_id: Option<&str>, now: DateTime<Utc>) -> CouponCheck {
    if let Some(reason) = rejection_at(coupon, now) {
        return CouponCheck::rejected(reason);
    }

    if let (Some(scope), Some(requested)) = (coupon.product_id.as_deref(), product_id) {
        if scope != requested {
            return CouponCheck::rejected(CouponRejection::ProductMismatch);
        }
    }

    CouponCheck::accepted()
}

/// Discount in minor units for `amount`; 0 when the coupon is not valid.
///
/// ```rust
/// use chrono::Utc;
/// use resale_core::coupon::calculate_discount;
/// use resale_core::money::Money;
/// use resale_core::types::{Coupon, DiscountType, NewCoupon};
///
/// let coupon = Coupon::from_new(
///     NewCoupon {
///         code: "flat500".into(),
///         product_id: None,
///         discount_type: DiscountType::Flat,
///         discount_value: 50_000,
///         max_uses: None,
///         valid_from: None,
///         valid_to: None,
///         is_active: true,
///     },
///     Utc::now(),
/// );
/// let discount = calculate_discount(&coupon, Money::from_minor(30_000), Utc::now());
/// assert_eq!(discount.minor(), 30_000);
/// ```
pub fn calculate_discount(coupon: &Coupon, amount: Money, now: DateTime<Utc>) -> Money {
    if !is_valid(coupon, now) || !amount.is_positive() {
        return Money::zero();
    }

    let discount = match coupon.discount_type {
        DiscountType::Percent => amount.percentage_of_bps(coupon.discount_value),
        DiscountType::Flat => Money::from_minor(coupon.discount_value).min(amount),
        DiscountType::Unsupported => Money::zero(),
    };

    // A negative stored value must never turn into a surcharge.
    discount.max(Money::zero())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, coupon};

    fn now() -> DateTime<Utc> {
        at("2025-06-15T12:00:00Z")
    }

    #[test]
    fn test_percent_discount() {
        let c = coupon(DiscountType::Percent, 1500);
        assert_eq!(
            calculate_discount(&c, Money::from_minor(200_000), now()).minor(),
            30_000
        );
    }

    #[test]
    fn test_percent_discount_floors() {
        let c = coupon(DiscountType::Percent, 1500);
        // 15% of 0.99 = 0.1485 → 0.14
        assert_eq!(calculate_discount(&c, Money::from_minor(99), now()).minor(), 14);
    }

    #[test]
    fn test_flat_discount_capped_at_amount() {
        let c = coupon(DiscountType::Flat, 50_000);
        assert_eq!(
            calculate_discount(&c, Money::from_minor(30_000), now()).minor(),
            30_000
        );
        assert_eq!(
            calculate_discount(&c, Money::from_minor(80_000), now()).minor(),
            50_000
        );
    }

    #[test]
    fn test_unsupported_type_gives_nothing() {
        let c = coupon(DiscountType::Unsupported, 50_000);
        assert!(calculate_discount(&c, Money::from_minor(30_000), now()).is_zero());
    }

    #[test]
    fn test_invalid_coupon_gives_nothing() {
        let mut c = coupon(DiscountType::Percent, 1500);
        c.is_active = false;
        assert!(calculate_discount(&c, Money::from_minor(200_000), now()).is_zero());
    }

    #[test]
    fn test_negative_value_never_surcharges() {
        let c = coupon(DiscountType::Flat, -100);
        assert!(calculate_discount(&c, Money::from_minor(1000), now()).is_zero());
    }

    #[test]
    fn test_usage_limit() {
        let mut c = coupon(DiscountType::Flat, 100);
        c.max_uses = Some(3);
        c.used_count = 2;
        assert!(is_valid(&c, now()));

        c.used_count = 3;
        assert!(!is_valid(&c, now()));
        assert_eq!(
            check(&c, None, now()).reason,
            Some(CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn test_validity_window_inclusive() {
        let mut c = coupon(DiscountType::Flat, 100);
        c.valid_from = Some(at("2025-06-01T00:00:00Z"));
        c.valid_to = Some(at("2025-06-30T23:59:59Z"));

        assert!(is_valid(&c, at("2025-06-01T00:00:00Z")));
        assert!(is_valid(&c, at("2025-06-30T23:59:59Z")));
        assert_eq!(
            check(&c, None, at("2025-05-31T23:59:59Z")).reason,
            Some(CouponRejection::NotYetValid)
        );
        assert_eq!(
            check(&c, None, at("2025-07-01T00:00:00Z")).reason,
            Some(CouponRejection::Expired)
        );
    }

    #[test]
    fn test_open_ended_window() {
        let mut c = coupon(DiscountType::Flat, 100);
        c.valid_from = Some(at("2025-01-01T00:00:00Z"));
        assert!(is_valid(&c, at("2099-01-01T00:00:00Z")));
    }

    #[test]
    fn test_product_scope() {
        let mut c = coupon(DiscountType::Flat, 100);
        c.product_id = Some("netflix".to_string());

        assert!(check(&c, Some("netflix"), now()).valid);
        assert!(check(&c, None, now()).valid);
        assert_eq!(
            check(&c, Some("spotify"), now()),
            CouponCheck {
                valid: false,
                reason: Some(CouponRejection::ProductMismatch),
            }
        );
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save15 "), "SAVE15");
        assert_eq!(coupon(DiscountType::Flat, 1).code, "SAVE15");
    }
}
