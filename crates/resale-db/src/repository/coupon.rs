//! # Coupon Repository
//!
//! Database operations for coupons.
//!
//! ## Usage Counting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  try_increment_usage() is a single conditional UPDATE:                 │
//! │                                                                         │
//! │    UPDATE coupons SET used_count = used_count + 1                      │
//! │    WHERE id = ? AND is_active = 1                                      │
//! │      AND (max_uses IS NULL OR used_count < max_uses)                   │
//! │                                                                         │
//! │  0 rows affected → limit reached (or coupon disabled) by someone else  │
//! │  so used_count can never pass max_uses, whatever the interleaving.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;
use tracing::debug;

use crate::error::{DbError, DbResult};
use resale_core::coupon::normalize_code;
use resale_core::{Coupon, DiscountType};

/// Repository for coupon database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CouponRepository;

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: String,
    code: String,
    product_id: Option<String>,
    discount_type: String,
    discount_value: i64,
    max_uses: Option<i64>,
    used_count: i64,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Coupon {
            id: row.id,
            code: row.code,
            product_id: row.product_id,
            // Unknown stored codes load as Unsupported and never discount
            discount_type: DiscountType::from_code(&row.discount_type),
            discount_value: row.discount_value,
            max_uses: row.max_uses,
            used_count: row.used_count,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl CouponRepository {
    /// Gets a coupon by code, case-insensitively.
    pub async fn get_by_code<'e, E>(executor: E, code: &str) -> DbResult<Option<Coupon>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = ?1")
            .bind(normalize_code(code))
            .fetch_optional(executor)
            .await?;

        Ok(row.map(Coupon::from))
    }

    /// Inserts a coupon. The code must already be normalised.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` on `coupons.code` for a duplicate code.
    pub async fn insert<'e, E>(executor: E, coupon: &Coupon) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        debug!(code = %coupon.code, discount_type = coupon.discount_type.as_code(), "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, product_id, discount_type, discount_value,
                max_uses, used_count, valid_from, valid_to, is_active,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12
            )
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(&coupon.product_id)
        .bind(coupon.discount_type.as_code())
        .bind(coupon.discount_value)
        .bind(coupon.max_uses)
        .bind(coupon.used_count)
        .bind(coupon.valid_from)
        .bind(coupon.valid_to)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(executor)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &coupon.code),
            other => other,
        })?;

        Ok(())
    }

    /// Counts one use if the coupon is active and below its limit.
    ///
    /// Returns `false` when nothing was updated.
    pub async fn try_increment_usage<'e, E>(
        executor: E,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE coupons SET
                used_count = used_count + 1,
                updated_at = ?2
            WHERE id = ?1
              AND is_active = 1
              AND (max_uses IS NULL OR used_count < max_uses)
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Enables or disables a coupon.
    pub async fn set_active<'e, E>(
        executor: E,
        code: &str,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        let code = normalize_code(code);

        let result =
            sqlx::query("UPDATE coupons SET is_active = ?2, updated_at = ?3 WHERE code = ?1")
                .bind(&code)
                .bind(is_active)
                .bind(now)
                .execute(executor)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", code));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use resale_core::NewCoupon;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn coupon(code: &str, max_uses: Option<i64>) -> Coupon {
        Coupon::from_new(
            NewCoupon {
                code: code.to_string(),
                product_id: None,
                discount_type: DiscountType::Percent,
                discount_value: 1500,
                max_uses,
                valid_from: None,
                valid_to: None,
                is_active: true,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_lookup_case_insensitive() {
        let db = db().await;
        let saved = coupon("save15", None);
        CouponRepository::insert(db.pool(), &saved).await.unwrap();

        let loaded = CouponRepository::get_by_code(db.pool(), " Save15 ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.code, "SAVE15");
        assert_eq!(loaded.discount_type, DiscountType::Percent);
        assert_eq!(loaded.id, saved.id);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = db().await;
        CouponRepository::insert(db.pool(), &coupon("SAVE15", None))
            .await
            .unwrap();

        let err = CouponRepository::insert(db.pool(), &coupon("save15", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref value, .. } if value == "SAVE15"
        ));
    }

    #[tokio::test]
    async fn test_usage_never_passes_limit() {
        let db = db().await;
        let limited = coupon("TWICE", Some(2));
        CouponRepository::insert(db.pool(), &limited).await.unwrap();

        let now = Utc::now();
        assert!(CouponRepository::try_increment_usage(db.pool(), &limited.id, now).await.unwrap());
        assert!(CouponRepository::try_increment_usage(db.pool(), &limited.id, now).await.unwrap());
        assert!(!CouponRepository::try_increment_usage(db.pool(), &limited.id, now).await.unwrap());

        let loaded = CouponRepository::get_by_code(db.pool(), "TWICE")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.used_count, 2);
    }

    #[tokio::test]
    async fn test_inactive_coupon_not_counted() {
        let db = db().await;
        let c = coupon("OFF", None);
        CouponRepository::insert(db.pool(), &c).await.unwrap();

        CouponRepository::set_active(db.pool(), "off", false, Utc::now())
            .await
            .unwrap();
        assert!(!CouponRepository::try_increment_usage(db.pool(), &c.id, Utc::now())
            .await
            .unwrap());

        assert!(matches!(
            CouponRepository::set_active(db.pool(), "missing", true, Utc::now()).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_stored_type_loads_as_unsupported() {
        let db = db().await;
        sqlx::query(
            r#"
            INSERT INTO coupons (id, code, discount_type, discount_value, created_at, updated_at)
            VALUES ('c1', 'BOGO', 'BUY_ONE_GET_ONE', 1, '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let loaded = CouponRepository::get_by_code(db.pool(), "bogo")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.discount_type, DiscountType::Unsupported);
    }
}
