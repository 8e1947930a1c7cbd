//! # Store Repository
//!
//! Tenant store profiles. The sale engine only reads them, to decide whether
//! and how a receipt goes out.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tendero_core::validation::validate_email;
use tendero_core::{StoreProfile, TenantId, ValidationError};

/// Repository for store profiles.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    /// Creates a new StoreRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Gets the tenant's profile, if one was registered.
    pub async fn get(&self, tenant: &TenantId) -> DbResult<Option<StoreProfile>> {
        let profile = sqlx::query_as::<_, StoreProfile>(
            r#"
            SELECT tenant_id, store_name, email, phone, currency, notify_new_sales, created_at
            FROM stores
            WHERE tenant_id = ?1
            "#,
        )
        .bind(tenant.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Creates or replaces the tenant's profile. `created_at` is kept on update.
    pub async fn upsert(
        &self,
        tenant: &TenantId,
        store_name: &str,
        email: &str,
        phone: Option<&str>,
        notify_new_sales: bool,
    ) -> DbResult<StoreProfile> {
        let store_name = store_name.trim();
        if store_name.is_empty() {
            return Err(ValidationError::Required {
                field: "store_name".to_string(),
            }
            .into());
        }
        let email = validate_email(email)?;

        debug!(tenant_id = %tenant, store_name, "Upserting store profile");

        sqlx::query(
            r#"
            INSERT INTO stores (tenant_id, store_name, email, phone, notify_new_sales, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (tenant_id) DO UPDATE SET
                store_name = excluded.store_name,
                email = excluded.email,
                phone = excluded.phone,
                notify_new_sales = excluded.notify_new_sales
            "#,
        )
        .bind(tenant.as_str())
        .bind(store_name)
        .bind(&email)
        .bind(phone)
        .bind(notify_new_sales)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get(tenant)
            .await?
            .ok_or_else(|| crate::DbError::not_found("Store", tenant.as_str()))
    }
}
