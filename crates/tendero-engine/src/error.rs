//! # Sale Error Type
//!
//! What callers of `create_sale` / `cancel_sale` see when an operation is
//! refused.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ValidationError ──────────────────────────► SaleError::Validation     │
//! │                                                                         │
//! │  CoreError::ProductNotFound / SaleNotFound ► SaleError::NotFound       │
//! │  CoreError::InsufficientStock ─────────────► SaleError::InsufficientStock
//! │  CoreError::AlreadyCancelled ──────────────► SaleError::Conflict       │
//! │                                                                         │
//! │  DbError::Busy / PoolExhausted ────────────► SaleError::Transient  ⟲   │
//! │  DbError::UniqueViolation(ticket_number) ──► SaleError::TicketConflict ⟲
//! │  anything else from the store ─────────────► SaleError::Internal       │
//! │                                                                         │
//! │  ⟲ = retried by the engine with backoff                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! [`ErrorBody`] is what an HTTP or IPC surface would send back:
//! ```json
//! { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for ..." }
//! ```

use serde::Serialize;
use tendero_core::{CoreError, ValidationError};
use tendero_db::DbError;
use thiserror::Error;

/// Errors returned by the sale engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaleError {
    /// The request itself is malformed. Nothing was touched.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown, inactive or foreign product; unknown sale.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A basket line asks for more than the scope could see in stock.
    #[error("Insufficient stock for {name} ({product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The operation contradicts the current state (e.g. re-cancel).
    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    /// Another scope committed the ticket number this one derived.
    #[error("Ticket number {ticket} was taken by a concurrent sale")]
    TicketConflict { ticket: String },

    /// The store could not serve the scope right now.
    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    /// Invariant violation or unexpected store failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine operations.
pub type SaleResult<T> = Result<T, SaleError>;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    InsufficientStock,
    Conflict,
    Transient,
    Internal,
}

/// Wire shape of a refused operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorKind,
    pub message: String,
}

impl SaleError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        SaleError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        SaleError::Conflict {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SaleError::Validation(_) => ErrorKind::ValidationError,
            SaleError::NotFound { .. } => ErrorKind::NotFound,
            SaleError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            SaleError::Conflict { .. } | SaleError::TicketConflict { .. } => ErrorKind::Conflict,
            SaleError::Transient(_) => ErrorKind::Transient,
            SaleError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether running the same scope again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SaleError::Transient(_) | SaleError::TicketConflict { .. })
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Converts store errors, keeping only what a caller can act on.
impl From<DbError> for SaleError {
    fn from(err: DbError) -> Self {
        if err.is_transient() {
            return SaleError::Transient(err.to_string());
        }

        match err {
            DbError::UniqueViolation { field, value } if field.contains("ticket_number") => {
                SaleError::TicketConflict { ticket: value }
            }
            DbError::NotFound { entity, id } => SaleError::NotFound { entity, id },
            DbError::Invalid(e) => SaleError::Validation(e),
            other => {
                tracing::error!(error = %other, "Unexpected store failure");
                SaleError::Internal(other.to_string())
            }
        }
    }
}

impl From<CoreError> for SaleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => SaleError::not_found("Product", id),
            CoreError::SaleNotFound(id) => SaleError::not_found("Sale", id),
            CoreError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => SaleError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            },
            CoreError::AlreadyCancelled(id) => {
                SaleError::conflict(format!("sale {id} is already cancelled"))
            }
            CoreError::InvalidTransition { sale_id, from, to } => {
                SaleError::conflict(format!("sale {sale_id} cannot move from {from} to {to}"))
            }
            CoreError::AmountOverflow { context } => {
                SaleError::Internal(format!("amount overflow while computing {context}"))
            }
            CoreError::Validation(e) => SaleError::Validation(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_mapping() {
        assert_eq!(
            SaleError::from(DbError::Busy("database is locked".into())).kind(),
            ErrorKind::Transient
        );
        assert!(SaleError::from(DbError::PoolExhausted).is_retryable());

        let ticket = SaleError::from(DbError::duplicate(
            "sales.tenant_id, sales.ticket_number",
            "20261019-0003",
        ));
        assert!(matches!(ticket, SaleError::TicketConflict { ref ticket } if ticket == "20261019-0003"));
        assert!(ticket.is_retryable());
        assert_eq!(ticket.kind(), ErrorKind::Conflict);

        let barcode = SaleError::from(DbError::duplicate("barcode", "7790"));
        assert_eq!(barcode.kind(), ErrorKind::Internal);
        assert!(!barcode.is_retryable());

        assert_eq!(
            SaleError::from(DbError::not_found("Sale", "s-1")),
            SaleError::not_found("Sale", "s-1")
        );
    }

    #[test]
    fn test_core_error_mapping() {
        let err = SaleError::from(CoreError::InsufficientStock {
            product_id: "p-1".into(),
            name: "Yerba".into(),
            available: 2,
            requested: 3,
        });
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert!(!err.is_retryable());

        let err = SaleError::from(CoreError::AlreadyCancelled("s-1".into()));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_body_serialization() {
        let body = SaleError::Validation(ValidationError::Required {
            field: "items".into(),
        })
        .to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "Validation error: items is required");

        let json = serde_json::to_value(SaleError::Transient("x".into()).to_body()).unwrap();
        assert_eq!(json["code"], "TRANSIENT");
    }
}
