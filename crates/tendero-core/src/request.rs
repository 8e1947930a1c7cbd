//! # Request Types
//!
//! Inbound shapes handed to the engine by the (external) HTTP or CLI surface.
//!
//! Request bodies are camelCase on the wire. None of them carries a tenant id:
//! the tenant always comes from authentication as a [`crate::TenantId`].
//!
//! ```text
//! {
//!   "items": [{ "productId": "…", "quantity": 3 }],
//!   "paymentMethod": "cash",
//!   "customer": { "customerEmail": "ana@example.com" },
//!   "receiptChannel": "email"
//! }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Category, PaymentMethod, ReceiptChannel, SaleStatus};

// =============================================================================
// Create Sale
// =============================================================================

/// One requested basket line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BasketLine {
    pub product_id: String,
    pub quantity: i64,
}

impl BasketLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        BasketLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Optional customer contact used for receipt delivery.
///
/// On the wire: `{ "customerEmail": ..., "customerPhone": ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerContact {
    #[serde(default, rename = "customerEmail")]
    pub email: Option<String>,
    #[serde(default, rename = "customerPhone")]
    pub phone: Option<String>,
}

impl CustomerContact {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }
}

/// Request to record a sale.
///
/// `payment_method` stays textual here so an unknown method surfaces as a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateSaleRequest {
    pub items: Vec<BasketLine>,
    pub payment_method: String,
    #[serde(default)]
    pub customer: Option<CustomerContact>,
    #[serde(default)]
    pub receipt_channel: Option<ReceiptChannel>,
}

impl CreateSaleRequest {
    /// Creates a request with no customer and no receipt.
    pub fn new(items: Vec<BasketLine>, payment_method: PaymentMethod) -> Self {
        CreateSaleRequest {
            items,
            payment_method: payment_method.as_str().to_string(),
            customer: None,
            receipt_channel: None,
        }
    }

    pub fn with_customer(mut self, customer: CustomerContact) -> Self {
        self.customer = Some(customer);
        self
    }

    pub fn with_receipt(mut self, channel: ReceiptChannel) -> Self {
        self.receipt_channel = Some(channel);
        self
    }
}

// =============================================================================
// Cancel Sale
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CancelSaleRequest {
    pub sale_id: String,
}

// =============================================================================
// Sale Queries
// =============================================================================

/// Filter for listing sales. Every field narrows the result; none is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleFilter {
    /// Inclusive lower bound on `created_at`.
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
    /// Maximum number of sales returned.
    pub limit: Option<i64>,
}

impl SaleFilter {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        SaleFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: SaleStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Data for a new catalog product (seeding and tests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub barcode: String,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
    #[serde(default = "default_min_stock")]
    pub min_stock: i64,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
}

fn default_min_stock() -> i64 {
    crate::DEFAULT_MIN_STOCK
}

impl NewProduct {
    pub fn new(barcode: impl Into<String>, name: impl Into<String>, price_cents: i64, stock: i64) -> Self {
        NewProduct {
            barcode: barcode.into(),
            name: name.into(),
            price_cents,
            stock,
            min_stock: crate::DEFAULT_MIN_STOCK,
            category: Category::default(),
            expiration_date: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_min_stock(mut self, min_stock: i64) -> Self {
        self.min_stock = min_stock;
        self
    }
}
