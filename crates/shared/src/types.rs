//! Common types used across Tenantry

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Tenant ID wrapper
///
/// The string form (`to_string`) is the canonical representation used for
/// session scope comparison, since session stores may round-trip the value
/// through JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Tenant records
// =============================================================================

/// A tenant: an organizational unit owning a slug and zero or more domains.
///
/// Domains are ordered; resolution treats the first match as authoritative.
/// The storage layer does not enforce cross-tenant domain uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub slug: String,
    pub domains: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Attributes for creating a tenant
#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub slug: String,
    #[serde(default)]
    pub domains: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_serializes_transparently() {
        let id = TenantId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }

    #[test]
    fn tenant_id_display_matches_inner_uuid() {
        let id = TenantId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
