//! Postgres-backed tenant directory
//!
//! Tenants live in a `tenants` table with a `TEXT[]` domain column; the
//! secondary index is the flat `tenant_domains` table. Containment queries
//! use `= ANY(domains)` so tier 2 works without the index table.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use tenantry_shared::{NewTenant, Tenant, TenantId};

use crate::directory::{DirectoryError, TenantDirectory};

/// Database row for a tenant
#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    slug: String,
    domains: Vec<String>,
    created_at: OffsetDateTime,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Self {
            id: TenantId(row.id),
            slug: row.slug,
            domains: row.domains,
            created_at: row.created_at,
        }
    }
}

/// Postgres tenant directory
#[derive(Clone)]
pub struct PgTenantDirectory {
    pool: PgPool,
}

impl PgTenantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantDirectory for PgTenantDirectory {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        let row: Option<TenantRow> = sqlx::query_as(
            "SELECT id, slug, domains, created_at FROM tenants WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tenant::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DirectoryError> {
        let row: Option<TenantRow> = sqlx::query_as(
            "SELECT id, slug, domains, created_at FROM tenants WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tenant::from))
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, DirectoryError> {
        // First match wins; created_at order keeps the winner stable
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, slug, domains, created_at
            FROM tenants
            WHERE $1 = ANY(domains)
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tenant::from))
    }

    fn stream_all(&self) -> BoxStream<'_, Result<Tenant, DirectoryError>> {
        sqlx::query_as::<_, TenantRow>(
            "SELECT id, slug, domains, created_at FROM tenants ORDER BY created_at",
        )
        .fetch(&self.pool)
        .map(|row| row.map(Tenant::from).map_err(DirectoryError::from))
        .boxed()
    }

    async fn create(&self, attrs: NewTenant) -> Result<Tenant, DirectoryError> {
        let row: TenantRow = sqlx::query_as(
            r#"
            INSERT INTO tenants (id, slug, domains)
            VALUES ($1, $2, $3)
            RETURNING id, slug, domains, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&attrs.slug)
        .bind(&attrs.domains)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                DirectoryError::Conflict(format!("slug '{}' already exists", attrs.slug))
            }
            _ => DirectoryError::from(err),
        })?;

        Ok(row.into())
    }

    async fn index_lookup(&self, domain: &str) -> Result<Option<TenantId>, DirectoryError> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT tenant_id FROM tenant_domains WHERE domain = $1 LIMIT 1")
                .bind(domain)
                .fetch_optional(&self.pool)
                .await?;

        Ok(id.map(TenantId))
    }

    async fn index_insert(
        &self,
        tenant_id: TenantId,
        domains: &[String],
    ) -> Result<(), DirectoryError> {
        if domains.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO tenant_domains (domain, tenant_id) SELECT unnest($1::text[]), $2",
        )
        .bind(domains)
        .bind(tenant_id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn index_purge(&self, tenant_id: TenantId) -> Result<(), DirectoryError> {
        sqlx::query("DELETE FROM tenant_domains WHERE tenant_id = $1")
            .bind(tenant_id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
