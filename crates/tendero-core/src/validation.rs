//! # Validation Module
//!
//! Input validation for sale requests and catalog data.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request shape (serde)                                        │
//! │  └── Types and required fields                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any store access)                        │
//! │  ├── Basket size and quantities                                        │
//! │  ├── Payment method                                                    │
//! │  └── Customer contact shape                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Inside the sale scope (tendero-engine)                       │
//! │  ├── Product exists, belongs to tenant, is active                      │
//! │  └── Stock is sufficient                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  └── UNIQUE (tenant_id, ticket_number)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tendero_core::validation::{validate_basket, validate_quantity};
//! use tendero_core::BasketLine;
//!
//! validate_quantity(5).unwrap();
//! validate_basket(&[BasketLine::new("p-1", 2)]).unwrap();
//! assert!(validate_basket(&[]).is_err());
//! ```

use crate::error::ValidationError;
use crate::request::{BasketLine, CreateSaleRequest, CustomerContact};
use crate::types::PaymentMethod;
use crate::MAX_BASKET_LINES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Sale Request Validators
// =============================================================================

/// Validates a basket line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// There is no upper bound here: whether a quantity can be sold is decided
/// by the stock on hand, inside the sale scope.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates the whole basket.
///
/// ## Rules
/// - At least one line, at most MAX_BASKET_LINES (100)
/// - Every line names a product
/// - Every quantity passes [`validate_quantity`]
///
/// The same product may appear on several lines; each line is decremented
/// separately inside the sale scope.
pub fn validate_basket(items: &[BasketLine]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_BASKET_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_BASKET_LINES as i64,
        });
    }

    for item in items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "productId".to_string(),
            });
        }
        validate_quantity(item.quantity)?;
    }

    Ok(())
}

/// Parses and validates a payment method.
pub fn validate_payment_method(raw: &str) -> ValidationResult<PaymentMethod> {
    if raw.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "payment_method".to_string(),
        });
    }
    raw.parse()
}

// =============================================================================
// Customer Contact
// =============================================================================

/// Validates and normalizes an email address.
///
/// ## Rules
/// - Trimmed and lowercased
/// - Shape `local@domain.tld` with no whitespace anywhere
///
/// ## Example
/// ```rust
/// use tendero_core::validation::validate_email;
///
/// assert_eq!(validate_email(" Ana@Example.COM ").unwrap(), "ana@example.com");
/// assert!(validate_email("ana@example").is_err());
/// assert!(validate_email("ana @example.com").is_err());
/// ```
pub fn validate_email(raw: &str) -> ValidationResult<String> {
    let email = raw.trim().to_lowercase();
    let invalid = || ValidationError::InvalidFormat {
        field: "customer_email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    // Needs a non-empty local part, and a dot in the domain with text on
    // both sides of it.
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() {
        return Err(invalid());
    }
    let dot = domain.rfind('.').ok_or_else(invalid)?;
    if dot == 0 || dot + 1 == domain.len() {
        return Err(invalid());
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "customer_email".to_string(),
            max: 254,
        });
    }

    Ok(email)
}

/// Validates and trims a phone number.
///
/// ## Rules
/// - Only digits, spaces and `+ - ( )`
/// - At least one digit
pub fn validate_phone(raw: &str) -> ValidationResult<String> {
    let phone = raw.trim();

    if phone.is_empty()
        || !phone.chars().any(|c| c.is_ascii_digit())
        || !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "customer_phone".to_string(),
            reason: "must contain only digits, spaces and + - ( )".to_string(),
        });
    }

    if phone.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "customer_phone".to_string(),
            max: 32,
        });
    }

    Ok(phone.to_string())
}

/// Validates a customer contact, returning its normalized form.
///
/// Blank strings count as absent.
pub fn normalize_contact(contact: &CustomerContact) -> ValidationResult<CustomerContact> {
    let email = contact
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .map(validate_email)
        .transpose()?;

    let phone = contact
        .phone
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(validate_phone)
        .transpose()?;

    Ok(CustomerContact { email, phone })
}

/// A create-sale request after every store-independent check passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSale {
    pub items: Vec<BasketLine>,
    pub payment_method: PaymentMethod,
    pub customer: CustomerContact,
    pub receipt_channel: crate::types::ReceiptChannel,
}

/// Runs every check on a create-sale request that needs no store access.
pub fn validate_create_sale(req: &CreateSaleRequest) -> ValidationResult<ValidatedSale> {
    validate_basket(&req.items)?;
    let payment_method = validate_payment_method(&req.payment_method)?;
    let customer = match &req.customer {
        Some(contact) => normalize_contact(contact)?,
        None => CustomerContact::default(),
    };

    Ok(ValidatedSale {
        items: req.items.clone(),
        payment_method,
        customer,
        receipt_channel: req.receipt_channel.unwrap_or_default(),
    })
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product barcode.
///
/// ## Rules
/// - Must not be empty, at most 64 characters
/// - Letters, digits and hyphens only
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 64,
        });
    }

    if !barcode.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1 to 200 characters after trimming).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a stock level or threshold. Zero is allowed.
pub fn validate_stock(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a new catalog product.
pub fn validate_new_product(product: &crate::request::NewProduct) -> ValidationResult<()> {
    validate_barcode(&product.barcode)?;
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_stock("stock", product.stock)?;
    validate_stock("min_stock", product.min_stock)?;
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use tendero_core::validation::validate_uuid;
///
/// assert!(validate_uuid("sale_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("sale_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::NewProduct;
    use crate::types::ReceiptChannel;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(1000).is_ok());
        assert!(validate_quantity(250_000).is_ok());

        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_basket() {
        assert!(validate_basket(&[BasketLine::new("p-1", 1)]).is_ok());

        let err = validate_basket(&[]).unwrap_err();
        assert_eq!(err.field(), "items");

        let err = validate_basket(&[BasketLine::new("  ", 1)]).unwrap_err();
        assert_eq!(err.field(), "productId");

        let err = validate_basket(&[BasketLine::new("p-1", 2), BasketLine::new("p-2", 0)])
            .unwrap_err();
        assert_eq!(err.field(), "quantity");

        let big: Vec<BasketLine> = (0..=MAX_BASKET_LINES)
            .map(|i| BasketLine::new(format!("p-{i}"), 1))
            .collect();
        assert!(validate_basket(&big).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("a@b.co").unwrap(), "a@b.co");
        assert_eq!(validate_email("  Ana@Mail.COM").unwrap(), "ana@mail.com");

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("@b.com").is_err());
        assert!(validate_email("a@.com").is_err());
        assert!(validate_email("a@b.").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@c.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone(" +54 (11) 4444-5555 ").unwrap(), "+54 (11) 4444-5555");
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("+-()").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn test_normalize_contact_blank_is_absent() {
        let contact = CustomerContact {
            email: Some("   ".to_string()),
            phone: Some("11 2222 3333".to_string()),
        };
        let normalized = normalize_contact(&contact).unwrap();
        assert_eq!(normalized.email, None);
        assert_eq!(normalized.phone.as_deref(), Some("11 2222 3333"));
    }

    #[test]
    fn test_validate_create_sale() {
        let req = CreateSaleRequest {
            items: vec![BasketLine::new("p-1", 3)],
            payment_method: "tarjeta".to_string(),
            customer: Some(CustomerContact {
                email: Some("ANA@example.com".to_string()),
                phone: None,
            }),
            receipt_channel: Some(ReceiptChannel::Email),
        };

        let ok = validate_create_sale(&req).unwrap();
        assert_eq!(ok.payment_method, PaymentMethod::Card);
        assert_eq!(ok.customer.email.as_deref(), Some("ana@example.com"));
        assert_eq!(ok.receipt_channel, ReceiptChannel::Email);

        let mut bad = req.clone();
        bad.payment_method = "crypto".to_string();
        assert_eq!(validate_create_sale(&bad).unwrap_err().field(), "payment_method");

        let mut bad = req;
        bad.payment_method = "".to_string();
        assert!(matches!(
            validate_create_sale(&bad),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_receipt_channel_defaults_to_none() {
        let req = CreateSaleRequest {
            items: vec![BasketLine::new("p-1", 1)],
            payment_method: "cash".to_string(),
            customer: None,
            receipt_channel: None,
        };
        assert_eq!(
            validate_create_sale(&req).unwrap().receipt_channel,
            ReceiptChannel::None
        );
    }

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("7790895000997").is_ok());
        assert!(validate_barcode("ABC-1").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("bad code").is_err());
        assert!(validate_barcode(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        assert!(validate_new_product(&NewProduct::new("779", "Leche 1L", 950, 20)).is_ok());
        assert!(validate_new_product(&NewProduct::new("779", "", 950, 20)).is_err());
        assert!(validate_new_product(&NewProduct::new("779", "Leche", -1, 20)).is_err());
        assert!(validate_new_product(&NewProduct::new("779", "Leche", 1, -20)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "nope").is_err());
    }
}
