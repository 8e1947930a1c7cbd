//! # tendero-engine: Sale Transaction Engine
//!
//! Turns a basket into a committed sale, and a committed sale back into
//! stock. Each operation runs in one transactional scope over tendero-db,
//! retried with backoff when the store was only busy.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller (HTTP / CLI)  ── authenticated TenantId + request ──┐          │
//! │                                                              ▼          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ tendero-engine (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   SaleEngine ──► retry (backoff) ──► scope (timeout)           │   │
//! │  │       │                                   │                     │   │
//! │  │       │ after commit                      ▼                     │   │
//! │  │       └──► ReceiptNotifier        ProductRepository            │   │
//! │  │            (spawned task)         SaleRepository               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                     SQLite (tendero-db)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tendero_core::{BasketLine, CreateSaleRequest, PaymentMethod, TenantId};
//! use tendero_db::{Database, DbConfig};
//! use tendero_engine::{EngineConfig, SaleEngine};
//!
//! let db = Database::new(DbConfig::new("./tendero.db")).await?;
//! let engine = SaleEngine::new(db).with_config(EngineConfig::from_env()?);
//!
//! let tenant = TenantId::new("kiosco-sol");
//! let request = CreateSaleRequest::new(vec![BasketLine::new(product_id, 2)], PaymentMethod::Cash);
//! let sale = engine.create_sale(&tenant, request).await?;
//! engine.cancel_sale(&tenant, &sale.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod retry;

// =============================================================================
// Re-exports
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::SaleEngine;
pub use error::{ErrorBody, ErrorKind, SaleError, SaleResult};
pub use notify::{LogNotifier, NoopNotifier, NotifyError, OutboxNotifier, ReceiptNotifier};
pub use retry::RetryPolicy;
