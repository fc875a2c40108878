//! Purchase operations: create, update, cancel, delete, read, reconcile.

use std::future::Future;

use chrono::{Datelike, Utc};
use secrecy::SecretString;
use tracing::{info, warn};

use super::Engine;
use crate::error::{DbError, DbResult};
use crate::repository::PurchaseRepository;
use resale_core::order_id::next_order_id_from;
use resale_core::validation::{validate_new_purchase, validate_order_prefix, validate_purchase_update};
use resale_core::{
    calculate_derived_fields, settle, Activation, NewPurchase, Purchase, PurchaseStatus,
    PurchaseUpdate, PurchaseView,
};

impl Engine {
    /// Creates a purchase and assigns it the next free order id.
    ///
    /// ## Steps
    /// 1. Validate input (nothing written on failure)
    /// 2. Seal the activation secret, if any
    /// 3. Derive validity/warranty end dates
    /// 4. Compute the initial settlement (no payments yet)
    /// 5. Insert, regenerating the order id on a uniqueness collision
    ///
    /// ## Errors
    /// - `Core(Validation)` for invalid input
    /// - `Conflict` when every attempt collided
    /// - `Timeout` when storage did not answer in time
    pub async fn create_purchase(&self, input: NewPurchase, actor_id: &str) -> DbResult<PurchaseView> {
        validate_new_purchase(&input)?;

        let mut input = input;
        let activation = input
            .activation
            .take()
            .map(|activation| activation.seal(self.vault(), None))
            .transpose()?;

        let purchase = Purchase::from_new(input, activation, actor_id, Utc::now());
        let purchase = calculate_derived_fields(purchase)?;
        let purchase = settle(purchase, &[])?;

        let prefix = self.settings.order_prefix.as_str();
        let year = purchase.created_at.year();

        let purchase = self
            .with_timeout(
                "create_purchase",
                self.insert_with_order_id(purchase, move || self.fetch_next_order_id(prefix, year)),
            )
            .await?;

        info!(
            id = %purchase.id,
            order_id = %purchase.order_id,
            created_by = %purchase.created_by,
            "Purchase created"
        );

        Ok(purchase.view())
    }

    /// Inserts `purchase`, asking `next_id` for a fresh order id before each
    /// attempt. Only a uniqueness violation on the order id is retried.
    pub(super) async fn insert_with_order_id<F, Fut>(
        &self,
        mut purchase: Purchase,
        mut next_id: F,
    ) -> DbResult<Purchase>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<String>>,
    {
        let attempts = self.settings.max_order_id_attempts.max(1);

        for attempt in 1..=attempts {
            purchase.order_id = next_id().await?;

            match PurchaseRepository::insert(self.db.pool(), &purchase).await {
                Ok(()) => return Ok(purchase),
                Err(err) if err.is_unique_violation_on("order_id") => {
                    warn!(
                        attempt,
                        attempts,
                        order_id = %purchase.order_id,
                        "Order id already taken, regenerating"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(DbError::conflict(format!(
            "no free order id after {} attempts (last tried {})",
            attempts, purchase.order_id
        )))
    }

    async fn fetch_next_order_id(&self, prefix: &str, year: i32) -> DbResult<String> {
        let latest = PurchaseRepository::latest_order_id(self.db.pool(), prefix, year).await?;
        next_order_id_from(prefix, year, latest.as_deref()).map_err(DbError::from)
    }

    /// Next order id for `prefix` in the current year.
    ///
    /// The id is not reserved; creation relies on the unique index and
    /// retries if someone else takes it first.
    pub async fn next_order_id(&self, prefix: &str) -> DbResult<String> {
        validate_order_prefix(prefix)?;
        let year = Utc::now().year();

        self.with_timeout("next_order_id", self.fetch_next_order_id(prefix, year))
            .await
    }

    /// Applies a partial update, re-derives dates and re-settles, atomically.
    pub async fn update_purchase(&self, id: &str, update: PurchaseUpdate) -> DbResult<PurchaseView> {
        validate_purchase_update(&update)?;

        let purchase = self
            .with_timeout("update_purchase", self.update_purchase_tx(id, update))
            .await?;

        info!(id = %purchase.id, order_id = %purchase.order_id, "Purchase updated");
        Ok(purchase.view())
    }

    async fn update_purchase_tx(&self, id: &str, update: PurchaseUpdate) -> DbResult<Purchase> {
        let mut tx = self.db.begin().await?;
        let mut purchase = Self::load_purchase(&mut tx, id).await?;

        update.apply_fields(&mut purchase);
        if let Some(activation) = update.activation {
            purchase.activation = Some(activation.seal(self.vault(), purchase.activation.as_ref())?);
        }
        purchase.updated_at = Utc::now();

        let purchase = calculate_derived_fields(purchase)?;
        PurchaseRepository::update(&mut *tx, &purchase).await?;
        let purchase = self.reconcile_on(&mut tx, purchase).await?;

        tx.commit().await?;
        Ok(purchase)
    }

    /// Marks a purchase CANCELLED. Settlement is still recomputed.
    pub async fn cancel_purchase(&self, id: &str) -> DbResult<PurchaseView> {
        let purchase = self
            .with_timeout("cancel_purchase", self.cancel_purchase_tx(id))
            .await?;

        info!(id = %purchase.id, order_id = %purchase.order_id, "Purchase cancelled");
        Ok(purchase.view())
    }

    async fn cancel_purchase_tx(&self, id: &str) -> DbResult<Purchase> {
        let mut tx = self.db.begin().await?;
        let mut purchase = Self::load_purchase(&mut tx, id).await?;

        purchase.status = PurchaseStatus::Cancelled;
        purchase.updated_at = Utc::now();
        PurchaseRepository::set_status(&mut *tx, id, purchase.status, purchase.updated_at).await?;
        let purchase = self.reconcile_on(&mut tx, purchase).await?;

        tx.commit().await?;
        Ok(purchase)
    }

    /// Deletes a purchase together with all of its payments.
    pub async fn delete_purchase(&self, id: &str) -> DbResult<()> {
        self.with_timeout("delete_purchase", PurchaseRepository::delete(self.db.pool(), id))
            .await?;

        info!(id = %id, "Purchase deleted");
        Ok(())
    }

    /// Reads a purchase. The activation secret is reported only as `has_secret`.
    pub async fn get_purchase(&self, id: &str) -> DbResult<PurchaseView> {
        let purchase = self
            .with_timeout("get_purchase", PurchaseRepository::get(self.db.pool(), id))
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", id))?;

        Ok(purchase.view())
    }

    /// Explicitly opens the sealed login secret of a purchase.
    ///
    /// ## Errors
    /// - `NotFound` when the purchase or its secret does not exist
    /// - `Core(DecryptionFailed)` when the stored envelope is damaged
    pub async fn reveal_secret(&self, id: &str) -> DbResult<SecretString> {
        let purchase = self
            .with_timeout("reveal_secret", PurchaseRepository::get(self.db.pool(), id))
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", id))?;

        let sealed = match &purchase.activation {
            Some(Activation::LoginCredentials {
                secret: Some(sealed),
                ..
            }) => sealed,
            _ => return Err(DbError::not_found("Activation secret", id)),
        };

        let secret = self.vault().open(sealed)?;
        info!(id = %id, order_id = %purchase.order_id, "Activation secret revealed");
        Ok(secret)
    }

    /// Recomputes settlement and status from the stored payments.
    ///
    /// Idempotent: a second call with no payment change in between returns
    /// the same purchase.
    pub async fn reconcile_settlement(&self, id: &str) -> DbResult<PurchaseView> {
        let purchase = self
            .with_timeout("reconcile_settlement", self.reconcile_settlement_tx(id))
            .await?;

        Ok(purchase.view())
    }

    async fn reconcile_settlement_tx(&self, id: &str) -> DbResult<Purchase> {
        let mut tx = self.db.begin().await?;
        let purchase = Self::load_purchase(&mut tx, id).await?;
        let purchase = self.reconcile_on(&mut tx, purchase).await?;
        tx.commit().await?;
        Ok(purchase)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
