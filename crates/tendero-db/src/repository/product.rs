//! # Product Repository (Catalog Store)
//!
//! Database operations for a tenant's product catalog.
//!
//! ## Two Kinds of Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POOL-LEVEL (&self)                 IN-SCOPE (conn: &mut SqliteConn)    │
//! │  ────────────────────               ───────────────────────────────     │
//! │  get, insert, update_price,         get_in, decrement_stock,            │
//! │  set_active, delete, count          restore_stock, exists_active        │
//! │                                                                         │
//! │  One statement, autocommit.         Run inside a sale scope opened by   │
//! │                                     Database::begin(); nothing is       │
//! │                                     visible until the scope commits.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conditional Decrement
//! ```text
//!   UPDATE products SET stock = stock - :qty
//!   WHERE id = :id AND tenant_id = :tenant AND is_active = 1 AND stock >= :qty
//!
//!   1 row  → reserved
//!   0 rows → missing, inactive, other tenant, or not enough stock
//! ```
//! The guard and the write are one statement, so two scopes can never both
//! take the last units. `CHECK (stock >= 0)` backs it up in the schema.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tendero_core::validation::validate_new_product;
use tendero_core::{NewProduct, Product, TenantId};

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Pool-level operations
    // =========================================================================

    /// Gets a product of the tenant by ID, active or not.
    pub async fn get(&self, tenant: &TenantId, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, tenant, id).await
    }

    /// Inserts a new product for the tenant.
    pub async fn insert(&self, tenant: &TenantId, new: &NewProduct) -> DbResult<Product> {
        validate_new_product(new)?;

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            tenant_id: tenant.as_str().to_string(),
            barcode: new.barcode.trim().to_string(),
            name: new.name.trim().to_string(),
            price_cents: new.price_cents,
            stock: new.stock,
            min_stock: new.min_stock,
            category: new.category,
            expiration_date: new.expiration_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(tenant_id = %tenant, id = %product.id, barcode = %product.barcode, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, barcode, name, price_cents, stock, min_stock,
                category, expiration_date, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.category)
        .bind(product.expiration_date)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, product.barcode.clone()),
            other => other,
        })?;

        Ok(product)
    }

    /// Changes a product's price. Recorded sales keep their snapshot.
    pub async fn update_price(&self, tenant: &TenantId, id: &str, price_cents: i64) -> DbResult<()> {
        debug!(tenant_id = %tenant, id = %id, price_cents, "Updating price");

        let result = sqlx::query(
            r#"
            UPDATE products SET price_cents = ?3, updated_at = ?4
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant.as_str())
        .bind(price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Activates or deactivates (soft-deletes) a product.
    pub async fn set_active(&self, tenant: &TenantId, id: &str, active: bool) -> DbResult<()> {
        debug!(tenant_id = %tenant, id = %id, active, "Setting product active flag");

        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = ?3, updated_at = ?4
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant.as_str())
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Physically removes a product from the catalog.
    ///
    /// Sale lines keep pointing at the removed id; cancelling such a sale
    /// skips the restore for that line.
    pub async fn delete(&self, tenant: &TenantId, id: &str) -> DbResult<()> {
        debug!(tenant_id = %tenant, id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts the tenant's active products.
    pub async fn count(&self, tenant: &TenantId) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1 AND is_active = 1")
                .bind(tenant.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    // =========================================================================
    // In-scope operations
    // =========================================================================

    /// Reads a product through `conn`, seeing the scope's own writes.
    pub async fn get_in(
        conn: &mut SqliteConnection,
        tenant: &TenantId,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, tenant_id, barcode, name, price_cents, stock, min_stock,
                category, expiration_date, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(product)
    }

    /// Whether the product exists for the tenant and is active.
    pub async fn exists_active(
        conn: &mut SqliteConnection,
        tenant: &TenantId,
        id: &str,
    ) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM products WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1",
        )
        .bind(id)
        .bind(tenant.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(found.is_some())
    }

    /// Takes `qty` units if the product is active and has at least that many.
    ///
    /// Returns `false` when nothing was decremented; the caller reads the
    /// product in the same scope to find out why.
    pub async fn decrement_stock(
        conn: &mut SqliteConnection,
        tenant: &TenantId,
        id: &str,
        qty: i64,
    ) -> DbResult<bool> {
        debug!(tenant_id = %tenant, id = %id, qty, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?3, updated_at = ?4
            WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1 AND stock >= ?3
            "#,
        )
        .bind(id)
        .bind(tenant.as_str())
        .bind(qty)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Gives `qty` units back, regardless of the active flag.
    ///
    /// Returns `false` when the product no longer exists.
    pub async fn restore_stock(
        conn: &mut SqliteConnection,
        tenant: &TenantId,
        id: &str,
        qty: i64,
    ) -> DbResult<bool> {
        debug!(tenant_id = %tenant, id = %id, qty, "Restoring stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?3, updated_at = ?4
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant.as_str())
        .bind(qty)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
