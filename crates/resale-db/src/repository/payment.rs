//! # Payment Repository
//!
//! Database operations for payments. Every write here must be followed by a
//! reconciliation of the owning purchase in the same transaction; the engine
//! takes care of that.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteExecutor;
use tracing::debug;

use crate::error::{DbError, DbResult};
use resale_core::{Money, Payment, PaymentType};

/// Repository for payment database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentRepository;

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    purchase_id: String,
    payment_type: PaymentType,
    amount: i64,
    paid_on: NaiveDate,
    method: Option<String>,
    reference: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            purchase_id: row.purchase_id,
            payment_type: row.payment_type,
            amount: Money::from_minor(row.amount),
            paid_on: row.paid_on,
            method: row.method,
            reference: row.reference,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PaymentRepository {
    /// Gets a payment by ID.
    pub async fn get<'e, E>(executor: E, id: &str) -> DbResult<Option<Payment>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, PaymentRow>("SELECT * FROM payments WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(row.map(Payment::from))
    }

    /// Gets every payment of a purchase, oldest first.
    pub async fn list_for_purchase<'e, E>(executor: E, purchase_id: &str) -> DbResult<Vec<Payment>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT * FROM payments
            WHERE purchase_id = ?1
            ORDER BY paid_on, created_at
            "#,
        )
        .bind(purchase_id)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(Payment::from).collect())
    }

    /// Records a payment.
    ///
    /// ## Errors
    /// `DbError::ForeignKeyViolation` if the purchase does not exist.
    pub async fn insert<'e, E>(executor: E, payment: &Payment) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        debug!(
            purchase_id = %payment.purchase_id,
            payment_type = ?payment.payment_type,
            amount = payment.amount.minor(),
            "Recording payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, purchase_id, payment_type, amount, paid_on,
                method, reference, created_by, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10
            )
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.purchase_id)
        .bind(payment.payment_type)
        .bind(payment.amount.minor())
        .bind(payment.paid_on)
        .bind(&payment.method)
        .bind(&payment.reference)
        .bind(&payment.created_by)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Rewrites the mutable fields of a payment. `purchase_id` never changes.
    pub async fn update<'e, E>(executor: E, payment: &Payment) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        debug!(id = %payment.id, amount = payment.amount.minor(), "Updating payment");

        let result = sqlx::query(
            r#"
            UPDATE payments SET
                payment_type = ?2,
                amount = ?3,
                paid_on = ?4,
                method = ?5,
                reference = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&payment.id)
        .bind(payment.payment_type)
        .bind(payment.amount.minor())
        .bind(payment.paid_on)
        .bind(&payment.method)
        .bind(&payment.reference)
        .bind(payment.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", &payment.id));
        }

        Ok(())
    }

    /// Deletes a payment.
    pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        debug!(id = %id, "Deleting payment");

        let result = sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", id));
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

    async fn db_with_purchase(purchase_id: &str) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, order_id, purchase_date, client_id, product_id,
                client_pay_total, vendor_pay_total, currency,
                created_by, created_at, updated_at
            ) VALUES (?1, 'PH-2025-00001', '2025-01-10', 'c1', 'p1', 1000, 500, 'INR',
                      'actor-1', '2025-01-10T00:00:00Z', '2025-01-10T00:00:00Z')
            "#,
        )
        .bind(purchase_id)
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    fn payment(purchase_id: &str, payment_type: PaymentType, amount: i64, day: u32) -> Payment {
        let now = Utc::now();
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            purchase_id: purchase_id.to_string(),
            payment_type,
            amount: Money::from_minor(amount),
            paid_on: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            method: Some("UPI".to_string()),
            reference: None,
            created_by: "actor-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_list_update_delete() {
        let db = db_with_purchase("p-1").await;

        let first = payment("p-1", PaymentType::Client, 400, 12);
        let second = payment("p-1", PaymentType::Vendor, 500, 11);
        PaymentRepository::insert(db.pool(), &first).await.unwrap();
        PaymentRepository::insert(db.pool(), &second).await.unwrap();

        let listed = PaymentRepository::list_for_purchase(db.pool(), "p-1")
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);

        let mut changed = first.clone();
        changed.amount = Money::from_minor(600);
        PaymentRepository::update(db.pool(), &changed).await.unwrap();
        let loaded = PaymentRepository::get(db.pool(), &first.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.amount.minor(), 600);
        assert_eq!(loaded.payment_type, PaymentType::Client);

        PaymentRepository::delete(db.pool(), &first.id).await.unwrap();
        assert!(PaymentRepository::get(db.pool(), &first.id)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            PaymentRepository::delete(db.pool(), &first.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_orphan_payment_rejected() {
        let db = db_with_purchase("p-1").await;

        let err = PaymentRepository::insert(db.pool(), &payment("ghost", PaymentType::Client, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_by_schema() {
        let db = db_with_purchase("p-1").await;

        let result = PaymentRepository::insert(db.pool(), &payment("p-1", PaymentType::Client, 0, 1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cascade_on_purchase_delete() {
        let db = db_with_purchase("p-1").await;
        PaymentRepository::insert(db.pool(), &payment("p-1", PaymentType::Client, 100, 1))
            .await
            .unwrap();

        sqlx::query("DELETE FROM purchases WHERE id = 'p-1'")
            .execute(db.pool())
            .await
            .unwrap();

        let left = PaymentRepository::list_for_purchase(db.pool(), "p-1")
            .await
            .unwrap();
        assert!(left.is_empty());
    }
}
