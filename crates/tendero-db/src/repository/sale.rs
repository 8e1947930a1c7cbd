//! # Sale Repository (Sale Ledger)
//!
//! Database operations for sales and their line snapshots.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (inside the sale scope)                                     │
//! │     ├── count_in_range()  → next ticket number                         │
//! │     ├── max_sequence_for_day() → highest issued number                 │
//! │     └── insert()          → sales row + sale_lines rows                │
//! │                                                                         │
//! │  2. READ                                                               │
//! │     ├── get_by_id()       → Sale with lines                            │
//! │     └── list()            → newest first, lines attached               │
//! │                                                                         │
//! │  3. CANCEL (inside the cancel scope)                                   │
//! │     └── mark_cancelled()  → completed → cancelled, conditional         │
//! │                                                                         │
//! │  Lines are written once and never updated.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tendero_core::{Sale, SaleFilter, SaleLine, SaleStatus, TenantId};

const SALE_COLUMNS: &str = "id, tenant_id, ticket_number, status, payment_method, \
     receipt_channel, total_cents, customer_email, customer_phone, created_at, updated_at, \
     cancelled_at";

const LINE_COLUMNS: &str = "id, sale_id, line_no, product_id, name_snapshot, barcode_snapshot, \
     quantity, unit_price_cents, subtotal_cents";

/// Repository for sale ledger operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Pool-level operations
    // =========================================================================

    /// Gets a sale of the tenant by ID, with its lines.
    pub async fn get_by_id(&self, tenant: &TenantId, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, tenant, id).await
    }

    /// Gets the lines of a sale in basket order.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let mut conn = self.pool.acquire().await?;
        Self::lines_in(&mut conn, sale_id).await
    }

    /// Lists the tenant's sales matching `filter`, newest first, lines attached.
    pub async fn list(&self, tenant: &TenantId, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        debug!(tenant_id = %tenant, ?filter, "Listing sales");

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        qb.push(SALE_COLUMNS);
        qb.push(" FROM sales WHERE tenant_id = ");
        qb.push_bind(tenant.as_str());

        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at < ").push_bind(to);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(method) = filter.payment_method {
            qb.push(" AND payment_method = ").push_bind(method);
        }

        qb.push(" ORDER BY created_at DESC, ticket_number DESC");

        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit.max(0));
        }

        let mut sales: Vec<Sale> = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        self.attach_lines(&mut sales).await?;

        Ok(sales)
    }

    /// Loads lines for many sales with one query.
    async fn attach_lines(&self, sales: &mut [Sale]) -> DbResult<()> {
        if sales.is_empty() {
            return Ok(());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        qb.push(LINE_COLUMNS);
        qb.push(" FROM sale_lines WHERE sale_id IN (");
        let mut ids = qb.separated(", ");
        for sale in sales.iter() {
            ids.push_bind(sale.id.as_str());
        }
        ids.push_unseparated(") ORDER BY sale_id, line_no");

        let lines: Vec<SaleLine> = qb.build_query_as::<SaleLine>().fetch_all(&self.pool).await?;

        let mut by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();
        for line in lines {
            by_sale.entry(line.sale_id.clone()).or_default().push(line);
        }
        for sale in sales.iter_mut() {
            sale.lines = by_sale.remove(&sale.id).unwrap_or_default();
        }

        Ok(())
    }

    // =========================================================================
    // In-scope operations
    // =========================================================================

    /// Counts the tenant's sales of any status created in `[start, end)`.
    ///
    /// Served by `idx_sales_tenant_created`.
    pub async fn count_in_range(
        conn: &mut SqliteConnection,
        tenant: &TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sales
            WHERE tenant_id = ?1 AND created_at >= ?2 AND created_at < ?3
            "#,
        )
        .bind(tenant.as_str())
        .bind(start)
        .bind(end)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Highest sequence among the tenant's tickets prefixed with `day`,
    /// whenever they were created. 0 when none exist.
    pub async fn max_sequence_for_day(
        conn: &mut SqliteConnection,
        tenant: &TenantId,
        day: NaiveDate,
    ) -> DbResult<i64> {
        let prefix = format!("{}-%", day.format("%Y%m%d"));
        let highest: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(CAST(substr(ticket_number, 10) AS INTEGER)), 0) FROM sales
            WHERE tenant_id = ?1 AND ticket_number LIKE ?2
            "#,
        )
        .bind(tenant.as_str())
        .bind(prefix)
        .fetch_one(&mut *conn)
        .await?;

        Ok(highest)
    }

    /// Inserts a sale and all of its lines.
    ///
    /// A ticket number already taken by the tenant fails with a
    /// `UniqueViolation` whose field names `ticket_number`.
    pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(
            tenant_id = %sale.tenant_id,
            id = %sale.id,
            ticket = %sale.ticket_number,
            lines = sale.lines.len(),
            "Inserting sale"
        );

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, ticket_number, status, payment_method, receipt_channel,
                total_cents, customer_email, customer_phone,
                created_at, updated_at, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.ticket_number)
        .bind(sale.status)
        .bind(sale.payment_method)
        .bind(sale.receipt_channel)
        .bind(sale.total_cents)
        .bind(&sale.customer_email)
        .bind(&sale.customer_phone)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.cancelled_at)
        .execute(&mut *conn)
        .await?;

        for line in &sale.lines {
            sqlx::query(
                r#"
                INSERT INTO sale_lines (
                    id, sale_id, line_no, product_id, name_snapshot, barcode_snapshot,
                    quantity, unit_price_cents, subtotal_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&line.id)
            .bind(&line.sale_id)
            .bind(line.line_no)
            .bind(&line.product_id)
            .bind(&line.name_snapshot)
            .bind(&line.barcode_snapshot)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.subtotal_cents)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Reads a sale with its lines through `conn`.
    pub async fn get_in(
        conn: &mut SqliteConnection,
        tenant: &TenantId,
        id: &str,
    ) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1 AND tenant_id = ?2");
        let sale: Option<Sale> = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .bind(tenant.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        match sale {
            Some(mut sale) => {
                sale.lines = Self::lines_in(conn, &sale.id).await?;
                Ok(Some(sale))
            }
            None => Ok(None),
        }
    }

    /// Current status of a sale, `None` if the tenant has no such sale.
    pub async fn status_in(
        conn: &mut SqliteConnection,
        tenant: &TenantId,
        id: &str,
    ) -> DbResult<Option<SaleStatus>> {
        let status: Option<SaleStatus> =
            sqlx::query_scalar("SELECT status FROM sales WHERE id = ?1 AND tenant_id = ?2")
                .bind(id)
                .bind(tenant.as_str())
                .fetch_optional(&mut *conn)
                .await?;

        Ok(status)
    }

    /// Lines of a sale in basket order, read through `conn`.
    pub async fn lines_in(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY line_no");
        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(lines)
    }

    /// Moves a sale to `cancelled` unless it already is.
    ///
    /// Returns `false` when no row changed: the sale is missing, belongs to
    /// another tenant, or was already cancelled.
    pub async fn mark_cancelled(
        conn: &mut SqliteConnection,
        tenant: &TenantId,
        id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(tenant_id = %tenant, id = %id, "Marking sale cancelled");

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = 'cancelled', cancelled_at = ?3, updated_at = ?3
            WHERE id = ?1 AND tenant_id = ?2 AND status = 'completed'
            "#,
        )
        .bind(id)
        .bind(tenant.as_str())
        .bind(at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale line ID.
pub fn generate_sale_line_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use tendero_core::{PaymentMethod, ReceiptChannel};

    fn sale(tenant: &TenantId, ticket: &str, at: DateTime<Utc>, method: PaymentMethod) -> Sale {
        let id = generate_sale_id();
        let lines = vec![
            SaleLine {
                id: generate_sale_line_id(),
                sale_id: id.clone(),
                line_no: 1,
                product_id: "p-1".to_string(),
                name_snapshot: "Yerba 1kg".to_string(),
                barcode_snapshot: "7790001".to_string(),
                quantity: 2,
                unit_price_cents: 1000,
                subtotal_cents: 2000,
            },
            SaleLine {
                id: generate_sale_line_id(),
                sale_id: id.clone(),
                line_no: 2,
                product_id: "p-2".to_string(),
                name_snapshot: "Pan".to_string(),
                barcode_snapshot: "7790002".to_string(),
                quantity: 1,
                unit_price_cents: 300,
                subtotal_cents: 300,
            },
        ];
        Sale {
            id,
            tenant_id: tenant.as_str().to_string(),
            ticket_number: ticket.to_string(),
            status: SaleStatus::Completed,
            payment_method: method,
            receipt_channel: ReceiptChannel::None,
            total_cents: 2300,
            customer_email: None,
            customer_phone: None,
            created_at: at,
            updated_at: at,
            cancelled_at: None,
            lines,
        }
    }

    async fn insert(db: &Database, sale: &Sale) -> DbResult<()> {
        let mut tx = db.begin().await?;
        SaleRepository::insert(&mut tx, sale).await?;
        tx.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_and_get_with_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = TenantId::new("t-1");
        let s = sale(&tenant, "20261019-0001", Utc::now(), PaymentMethod::Cash);
        insert(&db, &s).await.unwrap();

        let fetched = db.sales().get_by_id(&tenant, &s.id).await.unwrap().unwrap();
        assert_eq!(fetched.ticket_number, "20261019-0001");
        assert_eq!(fetched.lines.len(), 2);
        assert_eq!(fetched.lines[0].line_no, 1);
        assert_eq!(fetched.lines[1].name_snapshot, "Pan");
        assert_eq!(fetched.lines_total().unwrap().cents(), fetched.total_cents);

        assert!(db
            .sales()
            .get_by_id(&TenantId::new("t-2"), &s.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_ticket_is_a_ticket_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = TenantId::new("t-1");
        insert(&db, &sale(&tenant, "20261019-0001", Utc::now(), PaymentMethod::Cash))
            .await
            .unwrap();

        let err = insert(&db, &sale(&tenant, "20261019-0001", Utc::now(), PaymentMethod::Card))
            .await
            .unwrap_err();
        assert!(err.is_ticket_conflict(), "unexpected error: {err:?}");

        // Nothing of the failed sale survived.
        let all = db.sales().list(&tenant, &SaleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);

        // Another tenant can use the same number.
        insert(&db, &sale(&TenantId::new("t-2"), "20261019-0001", Utc::now(), PaymentMethod::Cash))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_count_in_range_is_half_open() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = TenantId::new("t-1");
        let start = DateTime::parse_from_rfc3339("2026-10-19T03:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let end = start + Duration::days(1);

        insert(&db, &sale(&tenant, "a", start, PaymentMethod::Cash)).await.unwrap();
        insert(&db, &sale(&tenant, "b", start + Duration::hours(5), PaymentMethod::Cash))
            .await
            .unwrap();
        insert(&db, &sale(&tenant, "c", end, PaymentMethod::Cash)).await.unwrap();
        insert(&db, &sale(&tenant, "d", start - Duration::milliseconds(1), PaymentMethod::Cash))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let count = SaleRepository::count_in_range(&mut conn, &tenant, start, end)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_max_sequence_for_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = TenantId::new("t-1");
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let yesterday = Utc::now() - Duration::days(1);

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            SaleRepository::max_sequence_for_day(&mut conn, &tenant, day).await.unwrap(),
            0
        );
        drop(conn);

        for ticket in ["20261019-0002", "20261019-0010", "20261020-0042"] {
            insert(&db, &sale(&tenant, ticket, yesterday, PaymentMethod::Cash))
                .await
                .unwrap();
        }
        insert(&db, &sale(&TenantId::new("t-2"), "20261019-0099", yesterday, PaymentMethod::Cash))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            SaleRepository::max_sequence_for_day(&mut conn, &tenant, day).await.unwrap(),
            10
        );
    }

    #[tokio::test]
    async fn test_mark_cancelled_only_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = TenantId::new("t-1");
        let s = sale(&tenant, "20261019-0001", Utc::now(), PaymentMethod::Cash);
        insert(&db, &s).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert!(SaleRepository::mark_cancelled(&mut tx, &tenant, &s.id, Utc::now()).await.unwrap());
        assert!(!SaleRepository::mark_cancelled(&mut tx, &tenant, &s.id, Utc::now()).await.unwrap());
        assert_eq!(
            SaleRepository::status_in(&mut tx, &tenant, &s.id).await.unwrap(),
            Some(SaleStatus::Cancelled)
        );
        assert_eq!(
            SaleRepository::status_in(&mut tx, &tenant, "missing").await.unwrap(),
            None
        );
        tx.commit().await.unwrap();

        let fetched = db.sales().get_by_id(&tenant, &s.id).await.unwrap().unwrap();
        assert!(fetched.is_cancelled());
        assert!(fetched.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = TenantId::new("t-1");
        let now = Utc::now();

        let first = sale(&tenant, "0001", now - Duration::hours(2), PaymentMethod::Cash);
        let second = sale(&tenant, "0002", now - Duration::hours(1), PaymentMethod::Card);
        let third = sale(&tenant, "0003", now, PaymentMethod::Cash);
        for s in [&first, &second, &third] {
            insert(&db, s).await.unwrap();
        }

        let mut tx = db.begin().await.unwrap();
        SaleRepository::mark_cancelled(&mut tx, &tenant, &third.id, now).await.unwrap();
        tx.commit().await.unwrap();

        let all = db.sales().list(&tenant, &SaleFilter::default()).await.unwrap();
        let tickets: Vec<&str> = all.iter().map(|s| s.ticket_number.as_str()).collect();
        assert_eq!(tickets, vec!["0003", "0002", "0001"]);
        assert!(all.iter().all(|s| s.lines.len() == 2));

        let cash = db
            .sales()
            .list(&tenant, &SaleFilter::default().with_payment_method(PaymentMethod::Cash))
            .await
            .unwrap();
        assert_eq!(cash.len(), 2);

        let completed_cash = db
            .sales()
            .list(
                &tenant,
                &SaleFilter::default()
                    .with_payment_method(PaymentMethod::Cash)
                    .with_status(SaleStatus::Completed),
            )
            .await
            .unwrap();
        assert_eq!(completed_cash.len(), 1);
        assert_eq!(completed_cash[0].id, first.id);

        let window = db
            .sales()
            .list(
                &tenant,
                &SaleFilter::between(now - Duration::minutes(90), now),
            )
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, second.id);

        let limited = db
            .sales()
            .list(&tenant, &SaleFilter { limit: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_lines_are_not_product_foreign_keys() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = TenantId::new("t-1");
        // p-1 and p-2 do not exist in the catalog at all.
        let s = sale(&tenant, "0001", Utc::now(), PaymentMethod::Transfer);
        insert(&db, &s).await.unwrap();

        let lines = db.sales().get_lines(&s.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, "p-1");
    }
}
