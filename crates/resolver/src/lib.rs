//! Tenantry Resolution Engine
//!
//! Resolves incoming host/domain strings to tenants through an ordered set
//! of lookup tiers:
//! - Tier 1: flat secondary index keyed by normalized domain
//! - Tier 2: structured containment query against the tenant store
//! - Tier 3: full scan with per-record normalization (last resort)
//!
//! Storage failures never abort a resolution; a failed tier degrades to a
//! miss and the next tier runs. An optional TTL cache fronts the whole
//! tier chain.

pub mod cache;
pub mod directory;
pub mod memory;
pub mod normalize;
pub mod pg;
pub mod resolver;

pub use cache::{CacheStats, ResolutionCache};
pub use directory::{DirectoryError, TenantDirectory};
pub use memory::MemoryDirectory;
pub use normalize::normalize_domain;
pub use pg::PgTenantDirectory;
pub use resolver::{DomainResolver, ResolverOptions};
