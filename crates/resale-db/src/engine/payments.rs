//! Payment operations. Each mutation reconciles its purchase before commit.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::Engine;
use crate::error::{DbError, DbResult};
use crate::repository::PaymentRepository;
use resale_core::validation::{validate_new_payment, validate_payment_update};
use resale_core::{NewPayment, Payment, PaymentUpdate, Purchase, PurchaseView};

/// A payment write together with the reconciled purchase it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedPayment {
    pub payment: Payment,
    pub purchase: PurchaseView,
}

impl Engine {
    /// Records a payment and reconciles its purchase in one transaction.
    ///
    /// ## Errors
    /// - `Core(Validation)` for a non-positive or unsafe amount
    /// - `NotFound` when the purchase does not exist (no orphan is written)
    pub async fn record_payment(&self, input: NewPayment, actor_id: &str) -> DbResult<RecordedPayment> {
        validate_new_payment(&input)?;

        let payment = Payment::from_new(input, actor_id, Utc::now());
        let (payment, purchase) = self
            .with_timeout("record_payment", self.record_payment_tx(payment))
            .await?;

        info!(
            payment_id = %payment.id,
            order_id = %purchase.order_id,
            payment_type = ?payment.payment_type,
            amount = payment.amount.minor(),
            "Payment recorded"
        );

        Ok(RecordedPayment {
            payment,
            purchase: purchase.view(),
        })
    }

    async fn record_payment_tx(&self, payment: Payment) -> DbResult<(Payment, Purchase)> {
        let mut tx = self.db.begin().await?;

        let purchase = Self::load_purchase(&mut tx, &payment.purchase_id).await?;
        PaymentRepository::insert(&mut *tx, &payment).await?;
        let purchase = self.reconcile_on(&mut tx, purchase).await?;

        tx.commit().await?;
        Ok((payment, purchase))
    }

    /// Changes amount, type, date or reference of a payment and reconciles.
    pub async fn update_payment(&self, payment_id: &str, update: PaymentUpdate) -> DbResult<RecordedPayment> {
        validate_payment_update(&update)?;

        let (payment, purchase) = self
            .with_timeout("update_payment", self.update_payment_tx(payment_id, update))
            .await?;

        info!(
            payment_id = %payment.id,
            order_id = %purchase.order_id,
            amount = payment.amount.minor(),
            "Payment updated"
        );

        Ok(RecordedPayment {
            payment,
            purchase: purchase.view(),
        })
    }

    async fn update_payment_tx(&self, payment_id: &str, update: PaymentUpdate) -> DbResult<(Payment, Purchase)> {
        let mut tx = self.db.begin().await?;

        let mut payment = PaymentRepository::get(&mut *tx, payment_id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", payment_id))?;
        update.apply_to(&mut payment);
        payment.updated_at = Utc::now();
        PaymentRepository::update(&mut *tx, &payment).await?;

        let purchase = Self::load_purchase(&mut tx, &payment.purchase_id).await?;
        let purchase = self.reconcile_on(&mut tx, purchase).await?;

        tx.commit().await?;
        Ok((payment, purchase))
    }

    /// Deletes a payment and returns its reconciled purchase.
    pub async fn delete_payment(&self, payment_id: &str) -> DbResult<PurchaseView> {
        let purchase = self
            .with_timeout("delete_payment", self.delete_payment_tx(payment_id))
            .await?;

        info!(payment_id = %payment_id, order_id = %purchase.order_id, "Payment deleted");
        Ok(purchase.view())
    }

    async fn delete_payment_tx(&self, payment_id: &str) -> DbResult<Purchase> {
        let mut tx = self.db.begin().await?;

        let payment = PaymentRepository::get(&mut *tx, payment_id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", payment_id))?;
        PaymentRepository::delete(&mut *tx, payment_id).await?;

        let purchase = Self::load_purchase(&mut tx, &payment.purchase_id).await?;
        let purchase = self.reconcile_on(&mut tx, purchase).await?;

        tx.commit().await?;
        Ok(purchase)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
