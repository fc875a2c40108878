//! # resale-db: Storage and Engine for the Resale Ledger
//!
//! SQLite storage (sqlx) plus the engine that keeps every purchase's
//! settlement consistent with its payments.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Resale Ledger Data Flow                          │
//! │                                                                         │
//! │  HTTP handler (record payment)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     resale-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Engine     │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (engine/)    │───►│ PurchaseRepo  │    │  (embedded)  │  │   │
//! │  │   │ validate,     │    │ PaymentRepo   │    │ 001_initial  │  │   │
//! │  │   │ settle, retry │    │ CouponRepo    │    │              │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │     resale_core    │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │   ┌─────────────────────────────────────┐                      │   │
//! │  │   │   Database (pool.rs): SqlitePool    │                      │   │
//! │  │   └─────────────────────────────────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file ($RESALE_DATABASE_PATH)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment configuration
//! - [`engine`] - Purchase, payment and coupon operations
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table queries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resale_db::{Engine, EngineConfig};
//!
//! let config = EngineConfig::from_env()?;
//! let engine = Engine::from_config(&config).await?;
//!
//! let purchase = engine.create_purchase(input, actor_id).await?;
//! let recorded = engine.record_payment(payment, actor_id).await?;
//! assert_eq!(recorded.purchase.id, purchase.id);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, EngineSettings, RecordedPayment};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{CouponRepository, PaymentRepository, PurchaseRepository};
