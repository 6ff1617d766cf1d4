//! Tenant directory abstraction
//!
//! The record store the resolver runs against. Implementations provide
//! equality lookups, a streaming full scan, and a flat secondary index
//! table keyed by normalized domain.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tenantry_shared::{NewTenant, Tenant, TenantId};

/// Errors surfaced by a tenant directory.
///
/// The resolver contains these at its boundary: a failing tier degrades to
/// a miss and the next tier runs. Only explicit admin operations (create,
/// resync) propagate them to callers.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Record store for tenants plus the flat domain index table.
///
/// `find_by_domain` is a structured containment query against the stored
/// domain collection, exactly as given (no normalization on the store
/// side). The index table holds `(normalized domain, tenant id)` rows and
/// is rebuilt wholesale per tenant; `index_purge` followed by
/// `index_insert` is deliberately not atomic (see the resolver docs).
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, DirectoryError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DirectoryError>;

    /// First tenant whose stored domain collection contains `domain`.
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, DirectoryError>;

    /// Lazy scan over every tenant record.
    fn stream_all(&self) -> BoxStream<'_, Result<Tenant, DirectoryError>>;

    async fn create(&self, attrs: NewTenant) -> Result<Tenant, DirectoryError>;

    /// Exact-match lookup in the domain index table.
    async fn index_lookup(&self, domain: &str) -> Result<Option<TenantId>, DirectoryError>;

    /// Bulk-insert index rows for a tenant.
    async fn index_insert(
        &self,
        tenant_id: TenantId,
        domains: &[String],
    ) -> Result<(), DirectoryError>;

    /// Delete all index rows for a tenant.
    async fn index_purge(&self, tenant_id: TenantId) -> Result<(), DirectoryError>;
}
