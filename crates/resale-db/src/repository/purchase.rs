//! # Purchase Repository
//!
//! Database operations for purchases.
//!
//! ## Column Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert()          every column                                        │
//! │  update()          authored + derived columns (dates, activation, ...) │
//! │  save_settlement() settlement_* and status, nothing else               │
//! │  set_status()      status (manual cancel)                              │
//! │  delete()          row, payments follow via ON DELETE CASCADE          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteExecutor;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::months_from_db;
use resale_core::order_id::year_stem;
use resale_core::{
    Activation, Amounts, Money, Purchase, PurchaseStatus, Settlement, Validity, Warranty,
};

/// Repository for purchase database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseRepository;

/// Raw `purchases` row.
#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: String,
    order_id: String,
    purchase_date: NaiveDate,
    client_id: String,
    product_id: String,
    vendor_id: Option<String>,
    validity_duration_months: Option<i64>,
    validity_start_date: Option<NaiveDate>,
    validity_end_date: Option<NaiveDate>,
    has_warranty: bool,
    warranty_months: Option<i64>,
    warranty_end_date: Option<NaiveDate>,
    activation: Option<String>,
    client_pay_total: i64,
    vendor_pay_total: i64,
    discount: i64,
    taxes: i64,
    fees: i64,
    currency: String,
    settlement_client_paid: i64,
    settlement_vendor_paid: i64,
    settlement_client_due: i64,
    settlement_vendor_due: i64,
    status: PurchaseStatus,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = DbError;

    fn try_from(row: PurchaseRow) -> DbResult<Self> {
        let activation = row
            .activation
            .as_deref()
            .map(serde_json::from_str::<Activation>)
            .transpose()
            .map_err(|e| {
                DbError::Corrupt(format!("activation of purchase {}: {}", row.id, e))
            })?;

        Ok(Purchase {
            validity: Validity {
                duration_months: months_from_db(
                    "validity_duration_months",
                    row.validity_duration_months,
                )?,
                start_date: row.validity_start_date,
                end_date: row.validity_end_date,
            },
            warranty: Warranty {
                has_warranty: row.has_warranty,
                months: months_from_db("warranty_months", row.warranty_months)?,
                end_date: row.warranty_end_date,
            },
            activation,
            amounts: Amounts {
                client_pay_total: Money::from_minor(row.client_pay_total),
                vendor_pay_total: Money::from_minor(row.vendor_pay_total),
                discount: Money::from_minor(row.discount),
                taxes: Money::from_minor(row.taxes),
                fees: Money::from_minor(row.fees),
                currency: row.currency,
            },
            settlement: Settlement {
                client_paid: Money::from_minor(row.settlement_client_paid),
                vendor_paid: Money::from_minor(row.settlement_vendor_paid),
                client_due: Money::from_minor(row.settlement_client_due),
                vendor_due: Money::from_minor(row.settlement_vendor_due),
            },
            id: row.id,
            order_id: row.order_id,
            purchase_date: row.purchase_date,
            client_id: row.client_id,
            product_id: row.product_id,
            vendor_id: row.vendor_id,
            status: row.status,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn activation_json(purchase: &Purchase) -> DbResult<Option<String>> {
    purchase
        .activation
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DbError::Internal(format!("encoding activation: {}", e)))
}

impl PurchaseRepository {
    /// Gets a purchase by ID.
    pub async fn get<'e, E>(executor: E, id: &str) -> DbResult<Option<Purchase>>
    where
        E: SqliteExecutor<'e>,
    {
        let row: Option<PurchaseRow> =
            sqlx::query_as::<_, PurchaseRow>("SELECT * FROM purchases WHERE id = ?1")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        row.map(Purchase::try_from).transpose()
    }

    /// Inserts a fully prepared purchase.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` on `purchases.order_id` when the id is taken.
    pub async fn insert<'e, E>(executor: E, purchase: &Purchase) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        debug!(id = %purchase.id, order_id = %purchase.order_id, "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, order_id, purchase_date, client_id, product_id, vendor_id,
                validity_duration_months, validity_start_date, validity_end_date,
                has_warranty, warranty_months, warranty_end_date,
                activation,
                client_pay_total, vendor_pay_total, discount, taxes, fees, currency,
                settlement_client_paid, settlement_vendor_paid,
                settlement_client_due, settlement_vendor_due,
                status, notes, created_by, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13,
                ?14, ?15, ?16, ?17, ?18, ?19,
                ?20, ?21,
                ?22, ?23,
                ?24, ?25, ?26, ?27, ?28
            )
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.order_id)
        .bind(purchase.purchase_date)
        .bind(&purchase.client_id)
        .bind(&purchase.product_id)
        .bind(&purchase.vendor_id)
        .bind(purchase.validity.duration_months.map(i64::from))
        .bind(purchase.validity.start_date)
        .bind(purchase.validity.end_date)
        .bind(purchase.warranty.has_warranty)
        .bind(purchase.warranty.months.map(i64::from))
        .bind(purchase.warranty.end_date)
        .bind(activation_json(purchase)?)
        .bind(purchase.amounts.client_pay_total.minor())
        .bind(purchase.amounts.vendor_pay_total.minor())
        .bind(purchase.amounts.discount.minor())
        .bind(purchase.amounts.taxes.minor())
        .bind(purchase.amounts.fees.minor())
        .bind(&purchase.amounts.currency)
        .bind(purchase.settlement.client_paid.minor())
        .bind(purchase.settlement.vendor_paid.minor())
        .bind(purchase.settlement.client_due.minor())
        .bind(purchase.settlement.vendor_due.minor())
        .bind(purchase.status)
        .bind(&purchase.notes)
        .bind(&purchase.created_by)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Writes the authored and derived columns of an existing purchase.
    ///
    /// Settlement and status are left alone; see [`Self::save_settlement`].
    pub async fn update<'e, E>(executor: E, purchase: &Purchase) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        debug!(id = %purchase.id, "Updating purchase");

        let result = sqlx::query(
            r#"
            UPDATE purchases SET
                purchase_date = ?2,
                vendor_id = ?3,
                validity_duration_months = ?4,
                validity_start_date = ?5,
                validity_end_date = ?6,
                has_warranty = ?7,
                warranty_months = ?8,
                warranty_end_date = ?9,
                activation = ?10,
                client_pay_total = ?11,
                vendor_pay_total = ?12,
                discount = ?13,
                taxes = ?14,
                fees = ?15,
                currency = ?16,
                notes = ?17,
                updated_at = ?18
            WHERE id = ?1
            "#,
        )
        .bind(&purchase.id)
        .bind(purchase.purchase_date)
        .bind(&purchase.vendor_id)
        .bind(purchase.validity.duration_months.map(i64::from))
        .bind(purchase.validity.start_date)
        .bind(purchase.validity.end_date)
        .bind(purchase.warranty.has_warranty)
        .bind(purchase.warranty.months.map(i64::from))
        .bind(purchase.warranty.end_date)
        .bind(activation_json(purchase)?)
        .bind(purchase.amounts.client_pay_total.minor())
        .bind(purchase.amounts.vendor_pay_total.minor())
        .bind(purchase.amounts.discount.minor())
        .bind(purchase.amounts.taxes.minor())
        .bind(purchase.amounts.fees.minor())
        .bind(&purchase.amounts.currency)
        .bind(&purchase.notes)
        .bind(purchase.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", &purchase.id));
        }

        Ok(())
    }

    /// Persists the reconciled settlement and status.
    pub async fn save_settlement<'e, E>(executor: E, purchase: &Purchase) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        debug!(
            id = %purchase.id,
            status = ?purchase.status,
            client_due = purchase.settlement.client_due.minor(),
            vendor_due = purchase.settlement.vendor_due.minor(),
            "Saving settlement"
        );

        let result = sqlx::query(
            r#"
            UPDATE purchases SET
                settlement_client_paid = ?2,
                settlement_vendor_paid = ?3,
                settlement_client_due = ?4,
                settlement_vendor_due = ?5,
                status = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&purchase.id)
        .bind(purchase.settlement.client_paid.minor())
        .bind(purchase.settlement.vendor_paid.minor())
        .bind(purchase.settlement.client_due.minor())
        .bind(purchase.settlement.vendor_due.minor())
        .bind(purchase.status)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", &purchase.id));
        }

        Ok(())
    }

    /// Sets the status directly (manual transitions only).
    pub async fn set_status<'e, E>(
        executor: E,
        id: &str,
        status: PurchaseStatus,
        updated_at: DateTime<Utc>,
    ) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE purchases SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(updated_at)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        Ok(())
    }

    /// Deletes a purchase; its payments are removed by the foreign key cascade
    /// in the same statement.
    pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        debug!(id = %id, "Deleting purchase");

        let result = sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        Ok(())
    }

    /// The stored id of `prefix` and `year` with the highest sequence.
    ///
    /// Only ids whose suffix is at least five digits and nothing else are
    /// considered. Sequences widen past five digits, so longer ids sort
    /// first before falling back to text order.
    pub async fn latest_order_id<'e, E>(executor: E, prefix: &str, year: i32) -> DbResult<Option<String>>
    where
        E: SqliteExecutor<'e>,
    {
        let stem = year_stem(prefix, year);

        let latest: Option<String> = sqlx::query_scalar::<_, String>(
            r#"
            SELECT order_id FROM purchases
            WHERE substr(order_id, 1, length(?1)) = ?1
              AND substr(order_id, length(?1) + 1) GLOB '[0-9][0-9][0-9][0-9][0-9]*'
              AND substr(order_id, length(?1) + 1) NOT GLOB '*[^0-9]*'
            ORDER BY length(order_id) DESC, order_id DESC
            LIMIT 1
            "#,
        )
        .bind(&stem)
        .fetch_optional(executor)
        .await?;

        Ok(latest)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use resale_core::{InviteStatus, SealedSecret};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample(order_id: &str) -> Purchase {
        let now = Utc::now();
        Purchase {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            client_id: "client-1".to_string(),
            product_id: "product-1".to_string(),
            vendor_id: None,
            validity: Validity {
                duration_months: Some(1),
                start_date: None,
                end_date: NaiveDate::from_ymd_opt(2025, 2, 28),
            },
            warranty: Warranty::default(),
            activation: Some(Activation::LoginCredentials {
                username: "client@example.com".to_string(),
                secret: Some(SealedSecret::from_envelope("v1:AAAA")),
            }),
            amounts: Amounts {
                client_pay_total: Money::from_minor(1000),
                vendor_pay_total: Money::from_minor(600),
                discount: Money::zero(),
                taxes: Money::zero(),
                fees: Money::zero(),
                currency: "INR".to_string(),
            },
            settlement: Settlement {
                client_due: Money::from_minor(1000),
                vendor_due: Money::from_minor(600),
                ..Default::default()
            },
            status: PurchaseStatus::Open,
            notes: None,
            created_by: "actor-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let purchase = sample("PH-2025-00001");

        PurchaseRepository::insert(db.pool(), &purchase).await.unwrap();
        let loaded = PurchaseRepository::get(db.pool(), &purchase.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded.order_id, "PH-2025-00001");
        assert_eq!(loaded.validity, purchase.validity);
        assert_eq!(loaded.activation, purchase.activation);
        assert_eq!(loaded.settlement, purchase.settlement);
        assert_eq!(loaded.status, PurchaseStatus::Open);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = db().await;
        assert!(PurchaseRepository::get(db.pool(), "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_order_id_rejected() {
        let db = db().await;
        PurchaseRepository::insert(db.pool(), &sample("PH-2025-00001"))
            .await
            .unwrap();

        let err = PurchaseRepository::insert(db.pool(), &sample("PH-2025-00001"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("order_id"));
    }

    #[tokio::test]
    async fn test_update_leaves_settlement_alone() {
        let db = db().await;
        let mut purchase = sample("PH-2025-00001");
        PurchaseRepository::insert(db.pool(), &purchase).await.unwrap();

        purchase.activation = Some(Activation::EmailInvite {
            email: "client@example.com".to_string(),
            status: InviteStatus::Accepted,
        });
        purchase.settlement.client_paid = Money::from_minor(999);
        PurchaseRepository::update(db.pool(), &purchase).await.unwrap();

        let loaded = PurchaseRepository::get(db.pool(), &purchase.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.activation, purchase.activation);
        assert!(loaded.settlement.client_paid.is_zero());
    }

    #[tokio::test]
    async fn test_latest_order_id_for_stem() {
        let db = db().await;
        assert_eq!(
            PurchaseRepository::latest_order_id(db.pool(), "PH", 2025).await.unwrap(),
            None
        );

        for id in ["PH-2025-00001", "PH-2025-00002", "PH-2024-00009", "SUB-2025-00004"] {
            PurchaseRepository::insert(db.pool(), &sample(id)).await.unwrap();
        }

        let latest = PurchaseRepository::latest_order_id(db.pool(), "PH", 2025)
            .await
            .unwrap();
        assert_eq!(latest.as_deref(), Some("PH-2025-00002"));
    }

    #[tokio::test]
    async fn test_latest_order_id_skips_malformed_and_widens() {
        let db = db().await;
        for id in [
            "PH-2025-99999",
            "PH-2025-100000",
            "PH-2025-ZZZZZ",
            "PH-2025-9x",
            "PH-2025-0042",
            "PH-2025-99999-old",
        ] {
            PurchaseRepository::insert(db.pool(), &sample(id)).await.unwrap();
        }

        let latest = PurchaseRepository::latest_order_id(db.pool(), "PH", 2025)
            .await
            .unwrap();
        assert_eq!(latest.as_deref(), Some("PH-2025-100000"));
    }

    #[tokio::test]
    async fn test_corrupt_activation_surfaces() {
        let db = db().await;
        let purchase = sample("PH-2025-00001");
        PurchaseRepository::insert(db.pool(), &purchase).await.unwrap();

        sqlx::query("UPDATE purchases SET activation = '{\"method\":\"CARRIER_PIGEON\"}' WHERE id = ?1")
            .bind(&purchase.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = PurchaseRepository::get(db.pool(), &purchase.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let db = db().await;
        let purchase = sample("PH-2025-00001");

        assert!(matches!(
            PurchaseRepository::update(db.pool(), &purchase).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            PurchaseRepository::save_settlement(db.pool(), &purchase).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            PurchaseRepository::delete(db.pool(), &purchase.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
