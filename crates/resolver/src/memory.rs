//! In-memory tenant directory
//!
//! Backs tests and single-node development setups. Carries failure
//! injection switches so degraded-storage paths can be exercised without a
//! database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use time::OffsetDateTime;

use tenantry_shared::{NewTenant, Tenant, TenantId};

use crate::directory::{DirectoryError, TenantDirectory};

/// In-memory tenant directory with failure injection
#[derive(Default)]
pub struct MemoryDirectory {
    tenants: RwLock<Vec<Tenant>>,
    index: RwLock<HashMap<String, TenantId>>,
    fail_index: AtomicBool,
    fail_index_insert: AtomicBool,
    fail_queries: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make index-table operations fail with `Unavailable`
    pub fn set_fail_index(&self, fail: bool) {
        self.fail_index.store(fail, Ordering::SeqCst);
    }

    /// Make only index inserts fail, leaving purges and lookups working
    pub fn set_fail_index_insert(&self, fail: bool) {
        self.fail_index_insert.store(fail, Ordering::SeqCst);
    }

    /// Make primary-store queries fail with `Unavailable`
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Number of index rows currently stored for a tenant
    pub fn index_rows(&self, tenant_id: TenantId) -> usize {
        self.index
            .read()
            .map(|index| index.values().filter(|id| **id == tenant_id).count())
            .unwrap_or(0)
    }

    fn check_index(&self) -> Result<(), DirectoryError> {
        if self.fail_index.load(Ordering::SeqCst) {
            Err(DirectoryError::Unavailable("index table offline".into()))
        } else {
            Ok(())
        }
    }

    fn check_queries(&self) -> Result<(), DirectoryError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            Err(DirectoryError::Unavailable("tenant store offline".into()))
        } else {
            Ok(())
        }
    }

    fn tenants_snapshot(&self) -> Vec<Tenant> {
        self.tenants.read().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TenantDirectory for MemoryDirectory {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        self.check_queries()?;
        Ok(self.tenants_snapshot().into_iter().find(|t| t.id == id))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DirectoryError> {
        self.check_queries()?;
        Ok(self.tenants_snapshot().into_iter().find(|t| t.slug == slug))
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, DirectoryError> {
        self.check_queries()?;
        Ok(self
            .tenants_snapshot()
            .into_iter()
            .find(|t| t.domains.iter().any(|d| d == domain)))
    }

    fn stream_all(&self) -> BoxStream<'_, Result<Tenant, DirectoryError>> {
        if let Err(err) = self.check_queries() {
            return futures::stream::iter(vec![Err(err)]).boxed();
        }
        futures::stream::iter(self.tenants_snapshot().into_iter().map(Ok)).boxed()
    }

    async fn create(&self, attrs: NewTenant) -> Result<Tenant, DirectoryError> {
        self.check_queries()?;

        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| DirectoryError::Unavailable("tenant store poisoned".into()))?;

        if tenants.iter().any(|t| t.slug == attrs.slug) {
            return Err(DirectoryError::Conflict(format!(
                "slug '{}' already exists",
                attrs.slug
            )));
        }

        let tenant = Tenant {
            id: TenantId::new(),
            slug: attrs.slug,
            domains: attrs.domains,
            created_at: OffsetDateTime::now_utc(),
        };
        tenants.push(tenant.clone());
        Ok(tenant)
    }

    async fn index_lookup(&self, domain: &str) -> Result<Option<TenantId>, DirectoryError> {
        self.check_index()?;
        Ok(self
            .index
            .read()
            .ok()
            .and_then(|index| index.get(domain).copied()))
    }

    async fn index_insert(
        &self,
        tenant_id: TenantId,
        domains: &[String],
    ) -> Result<(), DirectoryError> {
        self.check_index()?;
        if self.fail_index_insert.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("index insert rejected".into()));
        }
        if let Ok(mut index) = self.index.write() {
            for domain in domains {
                index.insert(domain.clone(), tenant_id);
            }
        }
        Ok(())
    }

    async fn index_purge(&self, tenant_id: TenantId) -> Result<(), DirectoryError> {
        self.check_index()?;
        if let Ok(mut index) = self.index.write() {
            index.retain(|_, id| *id != tenant_id);
        }
        Ok(())
    }
}

/// Test helper: remove a tenant record outright
impl MemoryDirectory {
    pub fn remove_tenant(&self, tenant_id: TenantId) {
        if let Ok(mut tenants) = self.tenants.write() {
            tenants.retain(|t| t.id != tenant_id);
        }
    }
}
