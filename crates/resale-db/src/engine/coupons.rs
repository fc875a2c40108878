//! Coupon operations: create, validate, redeem, enable/disable.
//!
//! Redemption re-checks the coupon and counts the use in the same
//! transaction; the conditional UPDATE in the repository is what finally
//! guarantees `used_count <= max_uses` under concurrency.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::Engine;
use crate::error::{DbError, DbResult};
use crate::repository::CouponRepository;
use resale_core::coupon::{self, CouponCheck, CouponRejection};
use resale_core::validation::{validate_new_coupon, validate_non_negative};
use resale_core::{Coupon, Money, NewCoupon, Redemption};

impl Engine {
    /// Creates a coupon. The code is stored upper-cased.
    ///
    /// ## Errors
    /// - `Core(Validation)` for a bad code, discount or window, including
    ///   discount types this engine cannot price
    /// - `UniqueViolation` when the code is taken
    pub async fn create_coupon(&self, input: NewCoupon) -> DbResult<Coupon> {
        validate_new_coupon(&input)?;

        let coupon = Coupon::from_new(input, Utc::now());
        self.with_timeout("create_coupon", CouponRepository::insert(self.db.pool(), &coupon))
            .await?;

        info!(
            code = %coupon.code,
            discount_type = coupon.discount_type.as_code(),
            discount_value = coupon.discount_value,
            "Coupon created"
        );
        Ok(coupon)
    }

    /// Looks up a coupon by code.
    pub async fn get_coupon(&self, code: &str) -> DbResult<Coupon> {
        self.with_timeout("get_coupon", CouponRepository::get_by_code(self.db.pool(), code))
            .await?
            .ok_or_else(|| DbError::not_found("Coupon", coupon::normalize_code(code)))
    }

    /// Checks whether a coupon could be applied at `now`, without using it.
    pub async fn validate_coupon(
        &self,
        code: &str,
        product_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<CouponCheck> {
        let coupon = self.get_coupon(code).await?;
        let result = coupon::check(&coupon, product_id, now);

        debug!(code = %coupon.code, valid = result.valid, reason = ?result.reason, "Coupon checked");
        Ok(result)
    }

    /// Applies a coupon to `amount` and counts one use.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown code
    /// - `CouponRejected` when the coupon does not apply, or its last use
    ///   was taken by a concurrent redemption
    pub async fn redeem_coupon(
        &self,
        code: &str,
        product_id: Option<&str>,
        amount: Money,
        now: DateTime<Utc>,
    ) -> DbResult<Redemption> {
        validate_non_negative(amount, "amount")?;

        let redemption = self
            .with_timeout("redeem_coupon", self.redeem_coupon_tx(code, product_id, amount, now))
            .await?;

        info!(
            code = %redemption.coupon.code,
            discount = redemption.discount.minor(),
            used_count = redemption.coupon.used_count,
            "Coupon redeemed"
        );
        Ok(redemption)
    }

    async fn redeem_coupon_tx(
        &self,
        code: &str,
        product_id: Option<&str>,
        amount: Money,
        now: DateTime<Utc>,
    ) -> DbResult<Redemption> {
        let mut tx = self.db.begin().await?;

        let mut coupon = CouponRepository::get_by_code(&mut *tx, code)
            .await?
            .ok_or_else(|| DbError::not_found("Coupon", coupon::normalize_code(code)))?;

        if let Some(reason) = coupon::check(&coupon, product_id, now).reason {
            return Err(DbError::CouponRejected {
                code: coupon.code,
                reason,
            });
        }

        let discount = coupon::calculate_discount(&coupon, amount, now);

        if !CouponRepository::try_increment_usage(&mut *tx, &coupon.id, now).await? {
            return Err(DbError::CouponRejected {
                code: coupon.code,
                reason: CouponRejection::UsageLimitReached,
            });
        }
        coupon.used_count += 1;
        coupon.updated_at = now;

        tx.commit().await?;
        Ok(Redemption { coupon, discount })
    }

    /// Enables or disables a coupon.
    pub async fn set_coupon_active(&self, code: &str, is_active: bool) -> DbResult<()> {
        self.with_timeout(
            "set_coupon_active",
            CouponRepository::set_active(self.db.pool(), code, is_active, Utc::now()),
        )
        .await?;

        info!(code = %coupon::normalize_code(code), is_active, "Coupon toggled");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
