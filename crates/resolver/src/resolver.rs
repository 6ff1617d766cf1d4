//! Multi-tier domain resolution
//!
//! Resolves a raw domain string to a tenant through strictly ordered tiers:
//!
//! 1. Flat index table, exact normalized-domain match (skipped if disabled)
//! 2. Structured containment query, retried with the raw input when it
//!    differs from the normalized form (tolerates un-normalized stores)
//! 3. Full scan with per-record normalization, first match wins
//!
//! Storage failures downgrade to tier misses and never reach the caller.
//! An optional TTL cache fronts the whole chain; only successful
//! resolutions are cached.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use tenantry_shared::{NewTenant, Tenant, TenantId};

use crate::cache::ResolutionCache;
use crate::directory::{DirectoryError, TenantDirectory};
use crate::normalize::normalize_domain;

/// Resolver construction options
pub struct ResolverOptions {
    /// Attempt tier-1 index lookups and maintain the index on sync
    pub use_index_table: bool,
    /// TTL cache fronting the tier chain; `None` disables caching
    pub cache: Option<ResolutionCache>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            use_index_table: true,
            cache: None,
        }
    }
}

impl ResolverOptions {
    pub fn with_cache(mut self, ttl: Duration, prefix: impl Into<String>) -> Self {
        self.cache = Some(ResolutionCache::new(ttl, prefix));
        self
    }
}

/// Domain resolver over a tenant directory
pub struct DomainResolver {
    directory: Arc<dyn TenantDirectory>,
    cache: Option<ResolutionCache>,
    use_index_table: bool,
}

impl DomainResolver {
    pub fn new(directory: Arc<dyn TenantDirectory>, options: ResolverOptions) -> Self {
        Self {
            directory,
            cache: options.cache,
            use_index_table: options.use_index_table,
        }
    }

    pub fn directory(&self) -> &Arc<dyn TenantDirectory> {
        &self.directory
    }

    pub fn cache(&self) -> Option<&ResolutionCache> {
        self.cache.as_ref()
    }

    /// Resolve a raw domain to a tenant id, or `None` when no tier matches.
    ///
    /// Un-normalizable input short-circuits to `None` without touching
    /// storage.
    pub async fn resolve_tenant_id(&self, raw_domain: &str) -> Option<TenantId> {
        let normalized = normalize_domain(raw_domain)?;

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&normalized) {
                tracing::trace!(domain = %normalized, tenant = %hit, "resolution cache hit");
                return Some(hit);
            }
            let resolved = self.resolve_tiers(raw_domain, &normalized).await;
            if let Some(tenant_id) = resolved {
                cache.insert(&normalized, tenant_id);
            }
            return resolved;
        }

        self.resolve_tiers(raw_domain, &normalized).await
    }

    /// Resolve a raw domain to the full tenant record.
    pub async fn resolve_tenant(&self, raw_domain: &str) -> Option<Tenant> {
        let tenant_id = self.resolve_tenant_id(raw_domain).await?;
        match self.directory.find_by_id(tenant_id).await {
            Ok(tenant) => tenant,
            Err(err) => {
                tracing::warn!(tenant = %tenant_id, error = %err, "tenant record fetch failed after resolution");
                None
            }
        }
    }

    async fn resolve_tiers(&self, raw: &str, normalized: &str) -> Option<TenantId> {
        // Tier 1: index table
        if self.use_index_table {
            match self.directory.index_lookup(normalized).await {
                Ok(Some(tenant_id)) => return Some(tenant_id),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(domain = %normalized, error = %err, "domain index lookup failed, falling through");
                }
            }
        }

        // Tier 2: structured containment query, normalized then raw
        if let Some(tenant_id) = self.containment_query(normalized).await {
            return Some(tenant_id);
        }
        if raw != normalized {
            if let Some(tenant_id) = self.containment_query(raw).await {
                return Some(tenant_id);
            }
        }

        // Tier 3: full scan with per-record normalization
        let mut tenants = self.directory.stream_all();
        while let Some(next) = tenants.next().await {
            match next {
                Ok(tenant) => {
                    let matched = tenant
                        .domains
                        .iter()
                        .filter_map(|d| normalize_domain(d))
                        .any(|d| d == normalized);
                    if matched {
                        return Some(tenant.id);
                    }
                }
                Err(err) => {
                    tracing::warn!(domain = %normalized, error = %err, "full scan aborted");
                    return None;
                }
            }
        }

        None
    }

    async fn containment_query(&self, domain: &str) -> Option<TenantId> {
        match self.directory.find_by_domain(domain).await {
            Ok(tenant) => tenant.map(|t| t.id),
            Err(err) => {
                tracing::warn!(domain = %domain, error = %err, "containment query failed, falling through");
                None
            }
        }
    }

    /// Create a tenant and synchronize its domain index rows.
    pub async fn create_tenant(&self, attrs: NewTenant) -> Result<Tenant, DirectoryError> {
        let tenant = self.directory.create(attrs).await?;
        self.sync_domain_index(&tenant).await;
        Ok(tenant)
    }

    /// Rebuild the index rows for a tenant from its current domain set.
    ///
    /// Purge-then-insert is not transactional: a concurrent lookup between
    /// the two steps sees no rows for this tenant and falls back to a full
    /// scan. A storage failure aborts the rebuild at that point; partial
    /// state is left for the next sync (or an external resync) to repair.
    pub async fn sync_domain_index(&self, tenant: &Tenant) {
        if !self.use_index_table {
            return;
        }

        if let Err(err) = self.directory.index_purge(tenant.id).await {
            tracing::warn!(tenant = %tenant.id, error = %err, "domain index purge failed, aborting sync");
            return;
        }

        let mut seen = HashSet::new();
        let domains: Vec<String> = tenant
            .domains
            .iter()
            .filter_map(|d| normalize_domain(d))
            .filter(|d| seen.insert(d.clone()))
            .collect();

        let mut synchronized = true;
        if !domains.is_empty() {
            if let Err(err) = self.directory.index_insert(tenant.id, &domains).await {
                tracing::warn!(tenant = %tenant.id, error = %err, "domain index insert failed, index left partial");
                synchronized = false;
            }
        }

        // The purge already changed the index, so stale cache entries must
        // go even when the insert failed
        if let Some(cache) = &self.cache {
            cache.invalidate_tenant(tenant.id);
        }

        if synchronized {
            tracing::info!(tenant = %tenant.id, rows = domains.len(), "domain index synchronized");
        }
    }

    /// Drop all index rows for a tenant. Storage errors are swallowed.
    pub async fn purge_domain_index(&self, tenant_id: TenantId) {
        if !self.use_index_table {
            return;
        }

        if let Err(err) = self.directory.index_purge(tenant_id).await {
            tracing::warn!(tenant = %tenant_id, error = %err, "domain index purge failed");
        }

        if let Some(cache) = &self.cache {
            cache.invalidate_tenant(tenant_id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryDirectory;

    fn resolver(directory: Arc<MemoryDirectory>, options: ResolverOptions) -> DomainResolver {
        DomainResolver::new(directory, options)
    }

    async fn seed(directory: &MemoryDirectory, slug: &str, domains: &[&str]) -> Tenant {
        directory
            .create(NewTenant {
                slug: slug.to_string(),
                domains: domains.iter().map(|d| d.to_string()).collect(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn resolves_via_index_after_sync() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(directory.clone(), ResolverOptions::default());

        let tenant = seed(&directory, "acme", &["acme.example.com"]).await;
        resolver.sync_domain_index(&tenant).await;

        assert_eq!(
            resolver.resolve_tenant_id("acme.example.com").await,
            Some(tenant.id)
        );
        // Raw variants normalize to the same index key
        assert_eq!(
            resolver.resolve_tenant_id("HTTPS://ACME.example.com./").await,
            Some(tenant.id)
        );
        assert_eq!(resolver.resolve_tenant_id("unknown.example.com").await, None);
    }

    #[tokio::test]
    async fn resolves_via_containment_when_index_disabled() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(
            directory.clone(),
            ResolverOptions {
                use_index_table: false,
                cache: None,
            },
        );

        let tenant = seed(&directory, "acme", &["acme.example.com"]).await;

        assert_eq!(
            resolver.resolve_tenant_id("acme.example.com").await,
            Some(tenant.id)
        );
    }

    #[tokio::test]
    async fn tier_two_retries_with_raw_input() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(
            directory.clone(),
            ResolverOptions {
                use_index_table: false,
                cache: None,
            },
        );

        // Store holds the domain with its original casing; the containment
        // query only matches the raw form.
        let tenant = seed(&directory, "acme", &["Acme.Example.com"]).await;

        assert_eq!(
            resolver.resolve_tenant_id("Acme.Example.com").await,
            Some(tenant.id)
        );
    }

    #[tokio::test]
    async fn full_scan_normalizes_stored_domains() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(
            directory.clone(),
            ResolverOptions {
                use_index_table: false,
                cache: None,
            },
        );

        let tenant = seed(&directory, "acme", &["HTTPS://Shop.Example.com."]).await;

        // Tiers 1-2 miss; tier 3 normalizes the stored value and matches
        assert_eq!(
            resolver.resolve_tenant_id("shop.example.com").await,
            Some(tenant.id)
        );
    }

    #[tokio::test]
    async fn index_failure_degrades_to_next_tier() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(directory.clone(), ResolverOptions::default());

        let tenant = seed(&directory, "acme", &["acme.example.com"]).await;
        resolver.sync_domain_index(&tenant).await;

        directory.set_fail_index(true);
        assert_eq!(
            resolver.resolve_tenant_id("acme.example.com").await,
            Some(tenant.id)
        );
    }

    #[tokio::test]
    async fn total_storage_failure_resolves_to_none() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(directory.clone(), ResolverOptions::default());

        let tenant = seed(&directory, "acme", &["acme.example.com"]).await;
        resolver.sync_domain_index(&tenant).await;

        directory.set_fail_index(true);
        directory.set_fail_queries(true);
        assert_eq!(resolver.resolve_tenant_id("acme.example.com").await, None);
    }

    #[tokio::test]
    async fn unnormalizable_input_short_circuits() {
        let directory = Arc::new(MemoryDirectory::new());
        // Everything offline: a short-circuit never notices
        directory.set_fail_index(true);
        directory.set_fail_queries(true);
        let resolver = resolver(directory, ResolverOptions::default());

        assert_eq!(resolver.resolve_tenant_id("").await, None);
        assert_eq!(resolver.resolve_tenant_id("   ").await, None);
        assert_eq!(resolver.resolve_tenant_id("https://").await, None);
    }

    #[tokio::test]
    async fn cache_serves_hits_until_ttl_expires() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(
            directory.clone(),
            ResolverOptions::default()
                .with_cache(Duration::from_millis(50), "tenancy:domain:tenant:"),
        );

        let tenant = seed(&directory, "acme", &["acme.example.com"]).await;
        resolver.sync_domain_index(&tenant).await;

        assert_eq!(
            resolver.resolve_tenant_id("acme.example.com").await,
            Some(tenant.id)
        );

        // Remove the record; the cached entry still answers
        directory.remove_tenant(tenant.id);
        directory.set_fail_index(true);
        assert_eq!(
            resolver.resolve_tenant_id("acme.example.com").await,
            Some(tenant.id)
        );

        // After expiry the chain recomputes and misses
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(resolver.resolve_tenant_id("acme.example.com").await, None);
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(
            directory.clone(),
            ResolverOptions::default()
                .with_cache(Duration::from_secs(60), "tenancy:domain:tenant:"),
        );

        assert_eq!(resolver.resolve_tenant_id("late.example.com").await, None);

        // The tenant shows up later; the earlier miss must not stick
        let tenant = seed(&directory, "late", &["late.example.com"]).await;
        resolver.sync_domain_index(&tenant).await;
        assert_eq!(
            resolver.resolve_tenant_id("late.example.com").await,
            Some(tenant.id)
        );
    }

    #[tokio::test]
    async fn create_tenant_populates_index() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(directory.clone(), ResolverOptions::default());

        let tenant = resolver
            .create_tenant(NewTenant {
                slug: "acme".to_string(),
                domains: vec!["ACME.example.com".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(
            directory.index_lookup("acme.example.com").await.unwrap(),
            Some(tenant.id)
        );
    }

    #[tokio::test]
    async fn sync_dedupes_and_drops_unnormalizable_domains() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(directory.clone(), ResolverOptions::default());

        let tenant = seed(
            &directory,
            "acme",
            &["A.example.com", "a.example.com", "", "   "],
        )
        .await;
        resolver.sync_domain_index(&tenant).await;

        assert_eq!(directory.index_rows(tenant.id), 1);
    }

    #[tokio::test]
    async fn sync_insert_failure_invalidates_cache_and_stops() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(
            directory.clone(),
            ResolverOptions::default()
                .with_cache(Duration::from_secs(60), "tenancy:domain:tenant:"),
        );

        let tenant = seed(&directory, "acme", &["acme.example.com"]).await;
        resolver.sync_domain_index(&tenant).await;
        assert_eq!(
            resolver.resolve_tenant_id("acme.example.com").await,
            Some(tenant.id)
        );

        // The rebuild purges but cannot re-insert; the cached entry must
        // not survive the purge, and the next lookup degrades to tier 2
        directory.set_fail_index_insert(true);
        resolver.sync_domain_index(&tenant).await;

        assert_eq!(directory.index_rows(tenant.id), 0);
        assert_eq!(
            resolver.resolve_tenant_id("acme.example.com").await,
            Some(tenant.id)
        );
    }

    #[tokio::test]
    async fn sync_is_noop_when_index_disabled() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(
            directory.clone(),
            ResolverOptions {
                use_index_table: false,
                cache: None,
            },
        );

        let tenant = seed(&directory, "acme", &["acme.example.com"]).await;
        resolver.sync_domain_index(&tenant).await;

        assert_eq!(directory.index_rows(tenant.id), 0);
    }

    #[tokio::test]
    async fn purge_clears_index_but_record_still_resolves() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(directory.clone(), ResolverOptions::default());

        let tenant = resolver
            .create_tenant(NewTenant {
                slug: "acme".to_string(),
                domains: vec!["acme.example.com".to_string()],
            })
            .await
            .unwrap();

        resolver.purge_domain_index(tenant.id).await;
        assert_eq!(directory.index_rows(tenant.id), 0);

        // Tier 2 still answers from the primary record
        assert_eq!(
            resolver.resolve_tenant_id("acme.example.com").await,
            Some(tenant.id)
        );
    }

    #[tokio::test]
    async fn resolve_tenant_returns_full_record() {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = resolver(directory.clone(), ResolverOptions::default());

        let tenant = resolver
            .create_tenant(NewTenant {
                slug: "acme".to_string(),
                domains: vec!["acme.example.com".to_string()],
            })
            .await
            .unwrap();

        let resolved = resolver.resolve_tenant("acme.example.com").await.unwrap();
        assert_eq!(resolved.id, tenant.id);
        assert_eq!(resolved.slug, "acme");
    }
}
