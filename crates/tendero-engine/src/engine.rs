//! # Sale Engine
//!
//! Creates and cancels sales. Every attempt runs in one SQLite transaction
//! that spans the catalog and the sale ledger, so an operation either lands
//! completely or leaves no trace.
//!
//! ## Create Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  validate_create_sale(request)          (no store access)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────── attempt (≤ scope_timeout) ───────────────────────┐  │
//! │  │ BEGIN                                                            │  │
//! │  │ for each basket line, in basket order:                           │  │
//! │  │     UPDATE stock = stock - qty WHERE active AND stock >= qty     │  │
//! │  │     0 rows? → read in scope → NotFound | InsufficientStock       │  │
//! │  │     read product in scope → line snapshot, checked subtotal      │  │
//! │  │ COUNT sales of the local day → ticket YYYYMMDD-(count+1)         │  │
//! │  │     taken? → MAX issued sequence of that day + 1                 │  │
//! │  │ check Σ subtotals == total, no negative stock                    │  │
//! │  │ INSERT sale + lines                                              │  │
//! │  │ COMMIT                                                           │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │       │  Transient / TicketConflict → backoff, new attempt             │
//! │       ▼                                                                 │
//! │  low-stock warnings, spawned receipt notification                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! The first statement of every scope is a write, so SQLite hands the scope
//! the writer lock before it reads anything. Concurrent scopes queue on the
//! lock (bounded by the pool's busy timeout) and each one sees the stock
//! and ticket count the previous one committed. Whatever slips through is
//! caught by `CHECK (stock >= 0)` and `UNIQUE (tenant_id, ticket_number)` and
//! retried.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tendero_core::ticket::{business_day, day_bounds_utc, format_ticket_number};
use tendero_core::validation::{validate_create_sale, ValidatedSale};
use tendero_core::{
    BasketLine, CoreError, CreateSaleRequest, Money, Product, Sale, SaleFilter, SaleLine,
    SaleStatus, SalesSummary, SummaryPeriod, TenantId, ValidationError,
};
use tendero_db::repository::sale::{generate_sale_id, generate_sale_line_id};
use tendero_db::{Database, DbError, ProductRepository, SaleRepository};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{SaleError, SaleResult};
use crate::notify::{self, LogNotifier, ReceiptNotifier};
use crate::retry::{retry_if, RetryPolicy};

/// A committed sale plus the products it pushed to or below `min_stock`.
struct CreatedSale {
    sale: Sale,
    low_stock: Vec<Product>,
}

/// The sale transaction engine.
///
/// Cheap to clone; clones share the pool, clock and notifier.
#[derive(Clone)]
pub struct SaleEngine {
    db: Database,
    config: EngineConfig,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn ReceiptNotifier>,
}

impl std::fmt::Debug for SaleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaleEngine")
            .field("db", &self.db)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SaleEngine {
    /// Engine with default configuration, the system clock and receipts
    /// written to the log.
    pub fn new(db: Database) -> Self {
        let config = EngineConfig::default();
        SaleEngine {
            db,
            retry: config.retry_policy(),
            config,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.retry = config.retry_policy();
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ReceiptNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Records a sale for `tenant`.
    ///
    /// ## Errors
    /// - `Validation`: malformed basket, payment method or contact
    /// - `NotFound`: a product is unknown, inactive or another tenant's
    /// - `InsufficientStock`: a line asks for more than is in stock
    /// - `Transient`: the store stayed busy through every attempt
    /// - `Internal`: invariant violation or unexpected store failure
    ///
    /// On any error, no stock moved and no sale exists.
    pub async fn create_sale(
        &self,
        tenant: &TenantId,
        request: CreateSaleRequest,
    ) -> SaleResult<Sale> {
        let validated = validate_create_sale(&request)?;

        debug!(
            tenant_id = %tenant,
            lines = validated.items.len(),
            payment_method = validated.payment_method.as_str(),
            "Creating sale"
        );

        let validated = &validated;
        let created = self
            .run_scoped("create_sale", |attempt| {
                self.create_sale_attempt(tenant, validated, attempt)
            })
            .await?;

        let sale = created.sale;
        info!(
            tenant_id = %tenant,
            sale_id = %sale.id,
            ticket = %sale.ticket_number,
            total = %sale.total(),
            lines = sale.lines.len(),
            "Sale committed"
        );

        for product in &created.low_stock {
            warn!(
                tenant_id = %tenant,
                product_id = %product.id,
                name = %product.name,
                stock = product.stock,
                min_stock = product.min_stock,
                "Product reached low stock"
            );
        }

        notify::dispatch(
            self.db.clone(),
            Arc::clone(&self.notifier),
            tenant.clone(),
            sale.clone(),
        );

        Ok(sale)
    }

    async fn create_sale_attempt(
        &self,
        tenant: &TenantId,
        request: &ValidatedSale,
        attempt: u32,
    ) -> SaleResult<CreatedSale> {
        let now = self.clock.now();
        let offset = self.config.offset();
        let sale_id = generate_sale_id();

        let mut tx = self.db.begin().await?;

        let mut lines = Vec::with_capacity(request.items.len());
        let mut low_stock = Vec::new();
        let mut total = Money::zero();

        for (idx, item) in request.items.iter().enumerate() {
            let taken = ProductRepository::decrement_stock(
                &mut tx,
                tenant,
                &item.product_id,
                item.quantity,
            )
            .await?;
            if !taken {
                return Err(reservation_failure(&mut tx, tenant, item).await);
            }

            let product = ProductRepository::get_in(&mut tx, tenant, &item.product_id)
                .await?
                .ok_or_else(|| {
                    SaleError::Internal(format!(
                        "product {} vanished after its stock was reserved",
                        item.product_id
                    ))
                })?;

            if product.stock < 0 {
                error!(tenant_id = %tenant, product_id = %product.id, stock = product.stock, "Negative stock inside sale scope");
                return Err(SaleError::Internal(format!(
                    "stock of product {} went negative",
                    product.id
                )));
            }

            let line_no = idx as i64 + 1;
            let subtotal = product
                .price()
                .checked_mul_quantity(item.quantity)
                .ok_or_else(|| CoreError::AmountOverflow {
                    context: format!("subtotal of line {line_no}"),
                })?;
            total = total.checked_add(subtotal).ok_or_else(|| CoreError::AmountOverflow {
                context: "sale total".to_string(),
            })?;

            if product.is_low_stock() && product.stock + item.quantity > product.min_stock {
                low_stock.push(product.clone());
            }

            lines.push(SaleLine {
                id: generate_sale_line_id(),
                sale_id: sale_id.clone(),
                line_no,
                product_id: product.id,
                name_snapshot: product.name,
                barcode_snapshot: product.barcode,
                quantity: item.quantity,
                unit_price_cents: product.price_cents,
                subtotal_cents: subtotal.cents(),
            });
        }

        let day = business_day(now, offset);
        let (day_start, day_end) = day_bounds_utc(day, offset);
        let issued = SaleRepository::count_in_range(&mut tx, tenant, day_start, day_end).await?;

        let mut sale = Sale {
            id: sale_id,
            tenant_id: tenant.as_str().to_string(),
            ticket_number: format_ticket_number(day, issued + 1),
            status: SaleStatus::Completed,
            payment_method: request.payment_method,
            receipt_channel: request.receipt_channel,
            total_cents: total.cents(),
            customer_email: request.customer.email.clone(),
            customer_phone: request.customer.phone.clone(),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            lines,
        };

        check_sale_invariants(&sale)?;

        let inserted = insert_sale(&mut tx, &sale).await;
        if let Err(err) = inserted {
            if !matches!(err, SaleError::TicketConflict { .. }) {
                return Err(err);
            }

            // Numbers issued under a different store offset are not in the
            // day's count but still hold their ticket.
            let highest = SaleRepository::max_sequence_for_day(&mut tx, tenant, day).await?;
            if highest <= issued {
                return Err(err);
            }

            warn!(
                tenant_id = %tenant,
                taken = %sale.ticket_number,
                day_count = issued,
                highest,
                "Ticket number already issued, moving past it"
            );
            sale.ticket_number = format_ticket_number(day, highest + 1);
            insert_sale(&mut tx, &sale).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        debug!(tenant_id = %tenant, ticket = %sale.ticket_number, attempt, "Sale scope committed");
        Ok(CreatedSale { sale, low_stock })
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels a completed sale and gives its units back to the catalog.
    ///
    /// Stock returns to every product still in the catalog, active or not,
    /// whatever its current price. Lines whose product was deleted are
    /// skipped with a warning.
    ///
    /// ## Errors
    /// - `NotFound`: the tenant has no such sale
    /// - `Conflict`: the sale is already cancelled (cancelling is not idempotent)
    pub async fn cancel_sale(&self, tenant: &TenantId, sale_id: &str) -> SaleResult<Sale> {
        let sale_id = sale_id.trim();
        if sale_id.is_empty() {
            return Err(ValidationError::Required {
                field: "saleId".to_string(),
            }
            .into());
        }

        debug!(tenant_id = %tenant, sale_id, "Cancelling sale");

        let sale = self
            .run_scoped("cancel_sale", |attempt| {
                self.cancel_sale_attempt(tenant, sale_id, attempt)
            })
            .await?;

        info!(
            tenant_id = %tenant,
            sale_id = %sale.id,
            ticket = %sale.ticket_number,
            units = sale.units(),
            "Sale cancelled"
        );

        Ok(sale)
    }

    async fn cancel_sale_attempt(
        &self,
        tenant: &TenantId,
        sale_id: &str,
        attempt: u32,
    ) -> SaleResult<Sale> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let cancelled = SaleRepository::mark_cancelled(&mut tx, tenant, sale_id, now).await?;
        if !cancelled {
            let status = SaleRepository::status_in(&mut tx, tenant, sale_id).await?;
            return Err(match status {
                None => SaleError::not_found("Sale", sale_id),
                Some(SaleStatus::Cancelled) => CoreError::AlreadyCancelled(sale_id.to_string()).into(),
                Some(other) => CoreError::InvalidTransition {
                    sale_id: sale_id.to_string(),
                    from: other.as_str().to_string(),
                    to: SaleStatus::Cancelled.as_str().to_string(),
                }
                .into(),
            });
        }

        let lines = SaleRepository::lines_in(&mut tx, sale_id).await?;
        for line in &lines {
            let restored =
                ProductRepository::restore_stock(&mut tx, tenant, &line.product_id, line.quantity)
                    .await?;
            if !restored {
                warn!(
                    tenant_id = %tenant,
                    sale_id,
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    "Product no longer in catalog, stock not restored"
                );
            }
        }

        let sale = SaleRepository::get_in(&mut tx, tenant, sale_id)
            .await?
            .ok_or_else(|| SaleError::Internal(format!("sale {sale_id} vanished while cancelling")))?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(tenant_id = %tenant, sale_id, attempt, "Cancel scope committed");
        Ok(sale)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// A sale of the tenant with its lines.
    pub async fn get_sale(&self, tenant: &TenantId, sale_id: &str) -> SaleResult<Sale> {
        self.db
            .sales()
            .get_by_id(tenant, sale_id)
            .await?
            .ok_or_else(|| SaleError::not_found("Sale", sale_id))
    }

    /// The tenant's sales matching `filter`, newest first.
    pub async fn list_sales(&self, tenant: &TenantId, filter: &SaleFilter) -> SaleResult<Vec<Sale>> {
        Ok(self.db.sales().list(tenant, filter).await?)
    }

    /// Completed sales of the current local day, newest first.
    pub async fn today_sales(&self, tenant: &TenantId) -> SaleResult<Vec<Sale>> {
        let offset = self.config.offset();
        let (start, end) = day_bounds_utc(business_day(self.clock.now(), offset), offset);
        let filter = SaleFilter::between(start, end).with_status(SaleStatus::Completed);
        self.list_sales(tenant, &filter).await
    }

    /// Statistics over the tenant's completed sales in `period`.
    pub async fn sales_summary(
        &self,
        tenant: &TenantId,
        period: SummaryPeriod,
    ) -> SaleResult<SalesSummary> {
        let since: DateTime<Utc> = period.since(self.clock.now(), self.config.offset());
        let filter = SaleFilter {
            from: Some(since),
            status: Some(SaleStatus::Completed),
            ..SaleFilter::default()
        };

        let sales = self.list_sales(tenant, &filter).await?;
        Ok(SalesSummary::from_sales(&sales))
    }

    // =========================================================================
    // Scope runner
    // =========================================================================

    /// Runs `attempt` under the scope timeout, retrying retryable failures.
    ///
    /// A timed-out attempt is dropped mid-flight, which rolls its
    /// transaction back.
    async fn run_scoped<T, F, Fut>(&self, operation: &str, mut attempt: F) -> SaleResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = SaleResult<T>>,
    {
        let budget = self.config.scope_timeout;

        retry_if(
            &self.retry,
            operation,
            |n| {
                let scope = attempt(n);
                async move {
                    match timeout(budget, scope).await {
                        Ok(result) => result,
                        Err(_) => Err(SaleError::Transient(format!(
                            "scope exceeded {} ms",
                            budget.as_millis()
                        ))),
                    }
                }
            },
            SaleError::is_retryable,
        )
        .await
    }
}

/// Explains why a conditional decrement touched nothing, from inside the
/// same scope.
async fn reservation_failure(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    item: &BasketLine,
) -> SaleError {
    match ProductRepository::get_in(conn, tenant, &item.product_id).await {
        Ok(Some(product)) if product.is_active => CoreError::InsufficientStock {
            product_id: product.id,
            name: product.name,
            available: product.stock,
            requested: item.quantity,
        }
        .into(),
        Ok(_) => CoreError::ProductNotFound(item.product_id.clone()).into(),
        Err(e) => e.into(),
    }
}

/// Inserts `sale` in scope. A taken ticket surfaces as `TicketConflict`
/// naming the ticket that was tried.
async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> SaleResult<()> {
    SaleRepository::insert(conn, sale)
        .await
        .map_err(|e| match SaleError::from(e) {
            SaleError::TicketConflict { .. } => SaleError::TicketConflict {
                ticket: sale.ticket_number.clone(),
            },
            other => other,
        })
}

/// Refuses a sale whose stored total disagrees with its lines.
fn check_sale_invariants(sale: &Sale) -> SaleResult<()> {
    for line in &sale.lines {
        if line.unit_price().checked_mul_quantity(line.quantity) != Some(line.subtotal()) {
            error!(sale_id = %sale.id, line_no = line.line_no, "Line subtotal mismatch");
            return Err(SaleError::Internal(format!(
                "line {} subtotal does not match quantity × price",
                line.line_no
            )));
        }
    }

    if sale.lines_total() != Some(sale.total()) {
        error!(sale_id = %sale.id, total = sale.total_cents, "Sale total mismatch");
        return Err(SaleError::Internal(
            "sale total does not match the sum of its lines".to_string(),
        ));
    }

    Ok(())
}
