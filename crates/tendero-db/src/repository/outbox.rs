//! # Receipt Outbox Repository
//!
//! Queue of receipts waiting for an external delivery worker (SMTP,
//! WhatsApp). Tendero only produces entries; delivery lives elsewhere.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_sale COMMITS                                                   │
//! │       │                                                                 │
//! │       ▼  (spawned task, after commit)                                   │
//! │  OutboxNotifier::notify                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO receipt_outbox (channel, recipient, payload)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            DELIVERY WORKER (outside this repo)                  │   │
//! │  │                                                                 │   │
//! │  │  1. get_pending(limit)                                         │   │
//! │  │  2. For each entry:                                            │   │
//! │  │     a. Send email / WhatsApp message                           │   │
//! │  │     b. On success: mark_sent(id)                               │   │
//! │  │     c. On failure: mark_failed(id, error)                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  A failed enqueue is logged and dropped: it never touches the sale.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tendero_core::{ReceiptChannel, ReceiptOutboxEntry, Sale, StoreProfile};

/// What the delivery worker receives for each receipt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptPayload<'a> {
    sale: &'a Sale,
    store: &'a StoreProfile,
}

/// Repository for receipt outbox operations.
#[derive(Debug, Clone)]
pub struct ReceiptOutboxRepository {
    pool: SqlitePool,
}

impl ReceiptOutboxRepository {
    /// Creates a new ReceiptOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReceiptOutboxRepository { pool }
    }

    /// Queues a receipt for `sale` to `recipient` over `channel`.
    pub async fn queue(
        &self,
        sale: &Sale,
        store: &StoreProfile,
        channel: ReceiptChannel,
        recipient: &str,
    ) -> DbResult<ReceiptOutboxEntry> {
        let payload = serde_json::to_string(&ReceiptPayload { sale, store })?;

        let entry = ReceiptOutboxEntry {
            id: Uuid::new_v4().to_string(),
            tenant_id: sale.tenant_id.clone(),
            sale_id: sale.id.clone(),
            channel,
            recipient: recipient.to_string(),
            payload,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            sent_at: None,
        };

        debug!(
            tenant_id = %entry.tenant_id,
            sale_id = %entry.sale_id,
            channel = channel.as_str(),
            "Queuing receipt"
        );

        sqlx::query(
            r#"
            INSERT INTO receipt_outbox (
                id, tenant_id, sale_id, channel, recipient, payload,
                attempts, last_error, created_at, attempted_at, sent_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.tenant_id)
        .bind(&entry.sale_id)
        .bind(entry.channel)
        .bind(&entry.recipient)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Unsent entries, oldest first.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<ReceiptOutboxEntry>> {
        let entries = sqlx::query_as::<_, ReceiptOutboxEntry>(
            r#"
            SELECT
                id, tenant_id, sale_id, channel, recipient, payload,
                attempts, last_error, created_at, attempted_at, sent_at
            FROM receipt_outbox
            WHERE sent_at IS NULL
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries queued for one sale (any state).
    pub async fn for_sale(&self, sale_id: &str) -> DbResult<Vec<ReceiptOutboxEntry>> {
        let entries = sqlx::query_as::<_, ReceiptOutboxEntry>(
            r#"
            SELECT
                id, tenant_id, sale_id, channel, recipient, payload,
                attempts, last_error, created_at, attempted_at, sent_at
            FROM receipt_outbox
            WHERE sale_id = ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as delivered.
    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query("UPDATE receipt_outbox SET sent_at = ?2, attempted_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Records a failed delivery attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE receipt_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts unsent entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM receipt_outbox WHERE sent_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes entries delivered more than `days_old` days ago.
    pub async fn cleanup_sent(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));

        let result =
            sqlx::query("DELETE FROM receipt_outbox WHERE sent_at IS NOT NULL AND sent_at < ?1")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
