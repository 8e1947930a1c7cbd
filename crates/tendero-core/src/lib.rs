//! # tendero-core: Pure Business Logic for Tendero
//!
//! Domain types and rules shared by the storage layer and the sale
//! transaction engine. Nothing in here touches a database, a socket or the
//! system clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tendero Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Inbound surface (HTTP / CLI, out of this repo)         │   │
//! │  │       authenticated tenant id + CreateSale / CancelSale         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                tendero-engine (SaleEngine)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tendero-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ticket   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ YYYYMMDD- │  │  basket   │  │   │
//! │  │   │   Sale    │  │           │  │   NNNN    │  │  contact  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tendero-db (Database Layer)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Sale, SaleLine, StoreProfile, ...)
//! - [`request`] - Inbound request shapes (basket, customer contact, filters)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`ticket`] - Business-day math and ticket number formatting
//! - [`summary`] - Sales statistics over a set of sales
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use tendero_core::money::Money;
//! use tendero_core::ticket::format_ticket_number;
//!
//! let price = Money::from_cents(1000);
//! assert_eq!(price.multiply_quantity(3).cents(), 3000);
//!
//! let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
//! assert_eq!(format_ticket_number(day, 1), "20261019-0001");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod request;
pub mod summary;
pub mod ticket;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use request::*;
pub use summary::{PaymentMethodStats, ProductSales, SalesSummary, SummaryPeriod};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single basket.
///
/// ## Business Reason
/// Prevents runaway requests and keeps every sale scope short.
pub const MAX_BASKET_LINES: usize = 100;

/// Default minimum stock threshold for new products.
pub const DEFAULT_MIN_STOCK: i64 = 10;
