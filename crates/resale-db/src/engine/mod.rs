//! # Engine
//!
//! The write path of the resale ledger. Every operation validates its input,
//! applies the pure rules from `resale_core`, and persists the result in one
//! transaction under a storage timeout.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Payment Mutation                                  │
//! │                                                                         │
//! │  record_payment / update_payment / delete_payment                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate ──► BEGIN                                                    │
//! │                 │                                                       │
//! │                 ├── load purchase (NotFound is fatal: no orphans)      │
//! │                 ├── write payment                                      │
//! │                 ├── list payments   (reads its own write)              │
//! │                 ├── settle()        (resale_core::settlement)          │
//! │                 └── save settlement + status                           │
//! │               COMMIT                                                   │
//! │                                                                         │
//! │  Timeout at any step drops the transaction: SQLite rolls it back and   │
//! │  the caller gets DbError::Timeout (retryable).                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purchase Creation
//! ```text
//! validate ──► seal secret ──► derive dates ──► settle(no payments)
//!          ──► loop attempt in 1..=max_order_id_attempts
//!                 next_order_id ──► INSERT
//!                    ├── ok                           → done
//!                    ├── UNIQUE(order_id) violated    → next attempt
//!                    └── other error                  → fail
//!              exhausted → DbError::Conflict
//! ```
//!
//! Two reconciliations of the same purchase racing from different payment
//! writes may commit in either order; the next payment mutation recomputes
//! from the full payment set.

mod coupons;
mod payments;
mod purchases;

pub use payments::RecordedPayment;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{DbError, DbResult};
use crate::pool::{Database, DbConfig};
use crate::repository::{PaymentRepository, PurchaseRepository};
use resale_core::{settle, CredentialVault, Purchase, DEFAULT_ORDER_ID_ATTEMPTS, DEFAULT_ORDER_PREFIX};

/// Tunables of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Prefix of generated order ids.
    pub order_prefix: String,
    /// Insert attempts before a colliding order id becomes a Conflict.
    pub max_order_id_attempts: u32,
    /// Upper bound on each engine operation's storage work.
    pub storage_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            order_prefix: DEFAULT_ORDER_PREFIX.to_string(),
            max_order_id_attempts: DEFAULT_ORDER_ID_ATTEMPTS,
            storage_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        EngineSettings {
            order_prefix: config.order_prefix.clone(),
            max_order_id_attempts: config.max_order_id_attempts,
            storage_timeout: config.storage_timeout,
        }
    }
}

/// Purchase settlement and lifecycle engine.
///
/// Cheap to clone; clones share the pool and the vault.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    vault: Arc<CredentialVault>,
    settings: EngineSettings,
}

impl Engine {
    /// Creates an engine from its parts.
    pub fn new(db: Database, vault: Arc<CredentialVault>, settings: EngineSettings) -> Self {
        Engine {
            db,
            vault,
            settings,
        }
    }

    /// Builds the vault, opens the database and runs migrations.
    ///
    /// ## Errors
    /// - `DbError::Core(CoreError::Configuration)` when the vault key is unusable;
    ///   checked before any connection is opened
    /// - connection or migration failures
    pub async fn from_config(config: &EngineConfig) -> DbResult<Self> {
        let vault = CredentialVault::from_base64_key(&config.vault_key)?;

        let db = Database::new(
            DbConfig::new(config.database_path.clone()).max_connections(config.max_connections),
        )
        .await?;

        info!(
            order_prefix = %config.order_prefix,
            timeout_ms = config.storage_timeout.as_millis() as u64,
            "Engine ready"
        );

        Ok(Engine::new(db, Arc::new(vault), EngineSettings::from(config)))
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The credential vault used to seal activation secrets.
    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Runs `work` under the storage timeout.
    ///
    /// On expiry `work` is dropped, which rolls back any transaction it owns.
    async fn with_timeout<T, F>(&self, operation: &'static str, work: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        match tokio::time::timeout(self.settings.storage_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.settings.storage_timeout.as_millis() as u64,
                    "Storage operation timed out"
                );
                Err(DbError::timeout(operation))
            }
        }
    }

    /// Recomputes and stores the settlement of `purchase` on `conn`.
    ///
    /// Reads the payment set through the same connection, so a payment
    /// written earlier in the transaction is always included.
    async fn reconcile_on(&self, conn: &mut SqliteConnection, purchase: Purchase) -> DbResult<Purchase> {
        let payments = PaymentRepository::list_for_purchase(&mut *conn, &purchase.id).await?;

        let previous = purchase.status;
        let purchase = settle(purchase, &payments)?;
        PurchaseRepository::save_settlement(&mut *conn, &purchase).await?;

        if previous != purchase.status {
            info!(
                order_id = %purchase.order_id,
                from = ?previous,
                to = ?purchase.status,
                "Purchase status changed"
            );
        }

        Ok(purchase)
    }

    /// Loads a purchase on `conn` or fails with NotFound.
    async fn load_purchase(conn: &mut SqliteConnection, id: &str) -> DbResult<Purchase> {
        PurchaseRepository::get(&mut *conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", id))
    }
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use chrono::NaiveDate;
    use resale_core::{Amounts, Money, NewPayment, NewPurchase, PaymentType};

    pub const VAULT_KEY: [u8; 32] = [7u8; 32];

    pub async fn engine() -> Engine {
        engine_with(EngineSettings::default()).await
    }

    pub async fn engine_with(settings: EngineSettings) -> Engine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let vault = CredentialVault::from_key_bytes(&VAULT_KEY).unwrap();
        Engine::new(db, Arc::new(vault), settings)
    }

    /// An engine on a database file with a real pool, so operations can
    /// contend for SQLite's write lock.
    pub async fn file_engine(dir: &tempfile::TempDir, max_connections: u32) -> Engine {
        let config = DbConfig::new(dir.path().join("ledger.db")).max_connections(max_connections);
        let db = Database::new(config).await.unwrap();
        let vault = CredentialVault::from_key_bytes(&VAULT_KEY).unwrap();
        Engine::new(db, Arc::new(vault), EngineSettings::default())
    }

        pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn new_purchase(client_total: i64, vendor_total: i64) -> NewPurchase {
        NewPurchase {
            purchase_date: ymd(2025, 1, 31),
            client_id: "client-1".to_string(),
            product_id: "netflix-1y".to_string(),
            vendor_id: Some("vendor-1".to_string()),
            validity_duration_months: Some(12),
            validity_start_date: None,
            has_warranty: false,
            warranty_months: None,
            activation: None,
            amounts: Amounts {
                client_pay_total: Money::from_minor(client_total),
                vendor_pay_total: Money::from_minor(vendor_total),
                discount: Money::zero(),
                taxes: Money::zero(),
                fees: Money::zero(),
                currency: "INR".to_string(),
            },
            notes: None,
        }
    }

    pub fn new_payment(purchase_id: &str, payment_type: PaymentType, amount: i64) -> NewPayment {
        NewPayment {
            purchase_id: purchase_id.to_string(),
            payment_type,
            amount: Money::from_minor(amount),
            paid_on: ymd(2025, 2, 1),
            method: Some("UPI".to_string()),
            reference: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
