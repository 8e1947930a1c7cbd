//! # Receipt Notifications
//!
//! Fire-and-forget hand-off of a committed sale to whoever sends receipts.
//!
//! ## When a Receipt Goes Out
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_sale COMMITTED                                                 │
//! │       │                                                                 │
//! │       ▼  tokio::spawn (the caller already has its Sale)                 │
//! │  load StoreProfile ── none? ─────────────────────────► skip            │
//! │       │                                                                 │
//! │  notify_new_sales? ── false ─────────────────────────► skip            │
//! │       │                                                                 │
//! │  receipt channel + matching contact? ── no ──────────► skip            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReceiptNotifier::notify(sale, store)                                  │
//! │       │                                                                 │
//! │       └── Err ──► warn!, dropped. The sale stays committed.            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tendero_core::{ReceiptChannel, Sale, StoreProfile, TenantId};
use tendero_db::{Database, DbError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure to hand a receipt over.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Receipt store failed: {0}")]
    Store(#[from] DbError),

    #[error("Sale {0} has no recipient for its receipt channel")]
    NoRecipient(String),
}

/// Where a sale's receipt should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptTarget {
    pub channel: ReceiptChannel,
    pub recipient: String,
}

impl ReceiptTarget {
    /// The channel the customer picked, if the sale carries the contact it
    /// needs.
    pub fn for_sale(sale: &Sale) -> Option<Self> {
        let recipient = match sale.receipt_channel {
            ReceiptChannel::Email => sale.customer_email.as_deref(),
            ReceiptChannel::Whatsapp => sale.customer_phone.as_deref(),
            ReceiptChannel::None => None,
        }?;

        Some(ReceiptTarget {
            channel: sale.receipt_channel,
            recipient: recipient.to_string(),
        })
    }
}

/// Whether a committed sale gets a receipt at all.
pub fn should_notify(sale: &Sale, store: Option<&StoreProfile>) -> bool {
    match store {
        Some(store) => store.notify_new_sales && ReceiptTarget::for_sale(sale).is_some(),
        None => false,
    }
}

/// Receives finalized sales after commit.
///
/// Implementations must not assume they are awaited by the caller of
/// `create_sale`: they run on a spawned task and their errors are only
/// logged.
#[async_trait]
pub trait ReceiptNotifier: Send + Sync {
    async fn notify(&self, sale: &Sale, store: &StoreProfile) -> Result<(), NotifyError>;
}

// =============================================================================
// Implementations
// =============================================================================

/// Logs receipts instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl ReceiptNotifier for LogNotifier {
    async fn notify(&self, sale: &Sale, store: &StoreProfile) -> Result<(), NotifyError> {
        let target =
            ReceiptTarget::for_sale(sale).ok_or_else(|| NotifyError::NoRecipient(sale.id.clone()))?;

        info!(
            tenant_id = %sale.tenant_id,
            store = %store.store_name,
            ticket = %sale.ticket_number,
            channel = target.channel.as_str(),
            recipient = %target.recipient,
            total = %sale.total(),
            "Receipt ready"
        );
        Ok(())
    }
}

/// Queues receipts in the `receipt_outbox` table for a delivery worker.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    db: Database,
}

impl OutboxNotifier {
    pub fn new(db: Database) -> Self {
        OutboxNotifier { db }
    }
}

#[async_trait]
impl ReceiptNotifier for OutboxNotifier {
    async fn notify(&self, sale: &Sale, store: &StoreProfile) -> Result<(), NotifyError> {
        let target =
            ReceiptTarget::for_sale(sale).ok_or_else(|| NotifyError::NoRecipient(sale.id.clone()))?;

        let entry = self
            .db
            .receipt_outbox()
            .queue(sale, store, target.channel, &target.recipient)
            .await?;

        debug!(sale_id = %sale.id, outbox_id = %entry.id, "Receipt queued");
        Ok(())
    }
}

/// Drops every receipt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ReceiptNotifier for NoopNotifier {
    async fn notify(&self, _sale: &Sale, _store: &StoreProfile) -> Result<(), NotifyError> {
        Ok(())
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Spawns the post-commit notification for `sale`.
///
/// The store profile is read on the spawned task, so the caller returns as
/// soon as the sale is committed.
pub(crate) fn dispatch(
    db: Database,
    notifier: Arc<dyn ReceiptNotifier>,
    tenant: TenantId,
    sale: Sale,
) {
    tokio::spawn(async move {
        let store = match db.stores().get(&tenant).await {
            Ok(store) => store,
            Err(e) => {
                warn!(tenant_id = %tenant, sale_id = %sale.id, error = %e, "Could not load store profile for receipt");
                return;
            }
        };

        let Some(store) = store.filter(|s| should_notify(&sale, Some(s))) else {
            debug!(tenant_id = %tenant, sale_id = %sale.id, "No receipt for sale");
            return;
        };

        if let Err(e) = notifier.notify(&sale, &store).await {
            warn!(
                tenant_id = %tenant,
                sale_id = %sale.id,
                ticket = %sale.ticket_number,
                error = %e,
                "Receipt notification failed"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tendero_core::{PaymentMethod, SaleStatus};

    fn sale(channel: ReceiptChannel, email: Option<&str>, phone: Option<&str>) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s-1".into(),
            tenant_id: "t-1".into(),
            ticket_number: "20261019-0001".into(),
            status: SaleStatus::Completed,
            payment_method: PaymentMethod::Card,
            receipt_channel: channel,
            total_cents: 1500,
            customer_email: email.map(String::from),
            customer_phone: phone.map(String::from),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            lines: vec![],
        }
    }

    fn store(notify: bool) -> StoreProfile {
        StoreProfile {
            tenant_id: "t-1".into(),
            store_name: "Kiosco Sol".into(),
            email: "sol@example.com".into(),
            phone: None,
            currency: "ARS".into(),
            notify_new_sales: notify,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_receipt_target() {
        let s = sale(ReceiptChannel::Email, Some("ana@example.com"), Some("+54 11"));
        assert_eq!(
            ReceiptTarget::for_sale(&s),
            Some(ReceiptTarget {
                channel: ReceiptChannel::Email,
                recipient: "ana@example.com".into()
            })
        );

        let s = sale(ReceiptChannel::Whatsapp, Some("ana@example.com"), None);
        assert_eq!(ReceiptTarget::for_sale(&s), None);

        let s = sale(ReceiptChannel::None, Some("ana@example.com"), Some("+54 11"));
        assert_eq!(ReceiptTarget::for_sale(&s), None);
    }

    #[test]
    fn test_should_notify() {
        let s = sale(ReceiptChannel::Whatsapp, None, Some("+54 11 5555"));
        assert!(should_notify(&s, Some(&store(true))));
        assert!(!should_notify(&s, Some(&store(false))));
        assert!(!should_notify(&s, None));
    }

    #[tokio::test]
    async fn test_log_notifier_needs_recipient() {
        let s = sale(ReceiptChannel::Email, None, None);
        assert!(matches!(
            LogNotifier.notify(&s, &store(true)).await,
            Err(NotifyError::NoRecipient(_))
        ));
        assert!(NoopNotifier.notify(&s, &store(true)).await.is_ok());
    }
}
