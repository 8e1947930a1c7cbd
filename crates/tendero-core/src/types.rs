//! # Domain Types
//!
//! Core domain records used throughout Tendero.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  (tenant, id)   │   │  id (UUID)      │   │  sale_id (FK)   │       │
//! │  │  barcode        │   │  ticket_number  │   │  product_id     │       │
//! │  │  price_cents    │   │  status         │   │  name/barcode   │       │
//! │  │  stock          │   │  total_cents    │   │  (snapshots)    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SaleStatus    │   │ PaymentMethod   │   │ ReceiptChannel  │       │
//! │  │  Completed      │   │  Cash           │   │  Email          │       │
//! │  │  Cancelled      │   │  Transfer       │   │  Whatsapp       │       │
//! │  │  Pending (rsv.) │   │  Card           │   │  None           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Weak References
//! A [`SaleLine`] references its product by id only. The product may later be
//! deactivated, repriced or removed without touching recorded sales.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tenant
// =============================================================================

/// Verified tenant (store) identifier.
///
/// Only the authentication collaborator constructs these; request bodies
/// never carry one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenantId(String);

impl TenantId {
    /// Wraps an already-authenticated tenant id.
    pub fn new(id: impl Into<String>) -> Self {
        TenantId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Category
// =============================================================================

/// Catalog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Beverages,
    Bakery,
    Pantry,
    Dairy,
    Snacks,
    Cleaning,
    Other,
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in a tenant's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Barcode, unique per tenant.
    pub barcode: String,

    /// Display name shown on receipts.
    pub name: String,

    /// Unit price in cents (non-negative).
    pub price_cents: i64,

    /// Units on hand (never negative).
    pub stock: i64,

    /// Threshold at or below which the product counts as low on stock.
    pub min_stock: i64,

    pub category: Category,

    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,

    /// Soft-delete flag. Inactive products cannot be sold.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be sold right now.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && quantity > 0 && self.stock >= quantity
    }

    /// `stock <= min_stock`.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Expired strictly before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date.map(|d| d < today).unwrap_or(false)
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// ## State Machine
/// ```text
///   create_sale            cancel_sale
///  ─────────────► Completed ───────────► Cancelled (terminal)
///
///   Pending: reserved, no code path produces or consumes it
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale committed; stock was deducted.
    Completed,
    /// Sale was cancelled and its stock restored.
    Cancelled,
    /// Reserved for a future approval flow.
    Pending,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
            SaleStatus::Pending => "pending",
        }
    }

    /// Whether the state machine allows `self → next`.
    pub const fn can_transition_to(&self, next: SaleStatus) -> bool {
        matches!((self, next), (SaleStatus::Completed, SaleStatus::Cancelled))
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Card,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Transfer,
        PaymentMethod::Card,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Card => "card",
        }
    }
}

/// Parses canonical names and the legacy Spanish register names
/// (`efectivo`, `transferencia`, `tarjeta`), case-insensitively.
impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            "card" | "tarjeta" => Ok(PaymentMethod::Card),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Receipt Channel
// =============================================================================

/// How the customer asked to receive the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptChannel {
    Email,
    Whatsapp,
    None,
}

impl ReceiptChannel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReceiptChannel::Email => "email",
            ReceiptChannel::Whatsapp => "whatsapp",
            ReceiptChannel::None => "none",
        }
    }
}

impl Default for ReceiptChannel {
    fn default() -> Self {
        ReceiptChannel::None
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale.
///
/// Created atomically with its lines; afterwards only `status`,
/// `updated_at` and `cancelled_at` ever change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    /// `YYYYMMDD-NNNN`, unique per tenant.
    pub ticket_number: String,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub receipt_channel: ReceiptChannel,
    /// Σ line subtotals, computed by the engine.
    pub total_cents: i64,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Lines in basket order. Loaded separately from `sale_lines`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub lines: Vec<SaleLine>,
}

impl Sale {
    /// Returns the stored total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Recomputes Σ line subtotals, `None` on overflow.
    pub fn lines_total(&self) -> Option<Money> {
        self.lines
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.subtotal()))
    }

    /// Total units across all lines.
    pub fn units(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// A line in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    /// Position in the basket, starting at 1.
    pub line_no: i64,
    /// Weak reference; the product may no longer exist.
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Barcode at time of sale (frozen).
    pub barcode_snapshot: String,
    /// Quantity sold (≥ 1).
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// `quantity × unit_price_cents`.
    pub subtotal_cents: i64,
}

impl SaleLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Store Profile
// =============================================================================

/// Tenant profile handed to receipt notifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StoreProfile {
    pub tenant_id: String,
    pub store_name: String,
    pub email: String,
    pub phone: Option<String>,
    /// ISO 4217 code shown on receipts.
    pub currency: String,
    /// Whether receipts go out for new sales.
    pub notify_new_sales: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Receipt Outbox
// =============================================================================

/// A receipt waiting for an external delivery worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReceiptOutboxEntry {
    pub id: String,
    pub tenant_id: String,
    pub sale_id: String,
    pub channel: ReceiptChannel,
    /// Email address or phone number.
    pub recipient: String,
    /// The finalized sale and store profile as JSON.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub sent_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
