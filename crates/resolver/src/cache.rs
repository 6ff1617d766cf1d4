//! In-memory resolution cache with TTL
//!
//! Memoizes normalized-domain → tenant-id resolutions to keep the hot path
//! off the database. Only successful resolutions are cached; misses always
//! recompute. Entries are never authoritative and are always safe to drop.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tenantry_shared::TenantId;

/// Cache entry with expiration
#[derive(Clone)]
struct CacheEntry {
    tenant_id: TenantId,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(tenant_id: TenantId, ttl: Duration) -> Self {
        Self {
            tenant_id,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Thread-safe resolution cache
///
/// Keys are `prefix + normalized domain`. Concurrent overwrites of the same
/// key are idempotent, so no locking beyond the map lock is needed.
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    prefix: String,
}

impl ResolutionCache {
    pub fn new(ttl: Duration, prefix: impl Into<String>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            prefix: prefix.into(),
        }
    }

    fn key(&self, domain: &str) -> String {
        format!("{}{}", self.prefix, domain)
    }

    /// Get the cached tenant id for a normalized domain.
    /// Returns `None` when absent or expired.
    pub fn get(&self, domain: &str) -> Option<TenantId> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(&self.key(domain))?;

        if entry.is_expired() {
            None
        } else {
            Some(entry.tenant_id)
        }
    }

    /// Cache a normalized domain → tenant id mapping
    pub fn insert(&self, domain: &str, tenant_id: TenantId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(self.key(domain), CacheEntry::new(tenant_id, self.ttl));
        }
    }

    /// Invalidate a specific normalized domain
    pub fn invalidate(&self, domain: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(&self.key(domain));
        }
    }

    /// Invalidate all entries for a tenant (used after an index rebuild)
    pub fn invalidate_tenant(&self, tenant_id: TenantId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| entry.tenant_id != tenant_id);
        }
    }

    /// Clear expired entries (call periodically for memory management)
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| !entry.is_expired());
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.read() {
            let total = entries.len();
            let expired = entries.values().filter(|e| e.is_expired()).count();
            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
            }
        } else {
            CacheStats::default()
        }
    }
}

/// Cache statistics
#[derive(Default, Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}
