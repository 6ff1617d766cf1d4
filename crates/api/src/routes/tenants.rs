//! Tenant management routes
//!
//! Creating a tenant synchronizes its domain index rows as a side effect.
//! Collaborators that update a tenant's domain set out of band are expected
//! to hit the resync endpoint afterwards; the index is never maintained
//! implicitly on reads.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tenantry_resolver::{normalize_domain, DirectoryError};
use tenantry_shared::{NewTenant, Tenant, TenantId};

use crate::error::{ApiError, ApiResult};
use crate::middleware::ResolvedContext;
use crate::state::AppState;

fn directory_error(err: DirectoryError) -> ApiError {
    match err {
        DirectoryError::Conflict(msg) => ApiError::Conflict(msg),
        other => ApiError::Database(other.to_string()),
    }
}

/// Create a tenant and populate its domain index rows
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(body): Json<NewTenant>,
) -> ApiResult<(StatusCode, Json<Tenant>)> {
    if body.slug.trim().is_empty() {
        return Err(ApiError::Validation("slug must not be empty".to_string()));
    }
    if body
        .domains
        .iter()
        .any(|d| normalize_domain(d).is_none())
    {
        return Err(ApiError::Validation(
            "every domain must normalize to a non-empty host".to_string(),
        ));
    }

    let tenant = state
        .resolver
        .create_tenant(body)
        .await
        .map_err(directory_error)?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

/// Look up a tenant by id or slug
pub async fn get_tenant(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> ApiResult<Json<Tenant>> {
    let directory = state.resolver.directory();

    let tenant = if let Ok(id) = id_or_slug.parse::<Uuid>() {
        directory.find_by_id(TenantId(id)).await
    } else {
        directory.find_by_slug(&id_or_slug).await
    }
    .map_err(directory_error)?;

    tenant.map(Json).ok_or(ApiError::NotFound)
}

/// Rebuild the domain index rows for a tenant from its current domain set
pub async fn resync_domains(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let tenant = state
        .resolver
        .directory()
        .find_by_id(TenantId(id))
        .await
        .map_err(directory_error)?
        .ok_or(ApiError::NotFound)?;

    state.resolver.sync_domain_index(&tenant).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub host: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub tenant_id: TenantId,
    pub slug: String,
}

/// Diagnostic endpoint: run the resolution tiers for an arbitrary host
pub async fn resolve_host(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> ApiResult<Json<ResolveResponse>> {
    let tenant = state
        .resolver
        .resolve_tenant(&query.host)
        .await
        .ok_or(ApiError::NotFound)?;

    Ok(Json(ResolveResponse {
        tenant_id: tenant.id,
        slug: tenant.slug,
    }))
}

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub tenant_id: Option<TenantId>,
    pub tenant_slug: Option<String>,
    pub landlord_id: Option<TenantId>,
}

/// Report the context resolved for this request
pub async fn whoami(Extension(context): Extension<ResolvedContext>) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        tenant_id: context.tenant.as_ref().map(|t| t.id),
        tenant_slug: context.tenant.as_ref().map(|t| t.slug.clone()),
        landlord_id: context.landlord.as_ref().map(|t| t.id),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, Config, HttpConfig, ImpersonationConfig, SessionConfig};
    use crate::tokens::{ImpersonationTokens, MemoryImpersonationTokens};
    use std::sync::Arc;
    use tenantry_resolver::{DomainResolver, MemoryDirectory, ResolverOptions};

    fn state() -> AppState {
        let directory = Arc::new(MemoryDirectory::new());
        let resolver = Arc::new(DomainResolver::new(directory, ResolverOptions::default()));
        let tokens: Arc<dyn ImpersonationTokens> = Arc::new(MemoryImpersonationTokens::new());
        let config = Config {
            bind_address: "127.0.0.1:0".to_string(),
            database_url: "postgres://unused".to_string(),
            database_max_connections: 1,
            use_index_table: true,
            cache: CacheConfig {
                enabled: false,
                ttl_seconds: 60,
                prefix: "tenancy:domain:tenant:".to_string(),
            },
            session: SessionConfig {
                landlord_scope_key: "tenancy.landlord_id".to_string(),
                tenant_scope_key: "tenancy.tenant_id".to_string(),
                abort_status: StatusCode::FORBIDDEN,
                invalidate_on_mismatch: true,
            },
            http: HttpConfig {
                abort_status: StatusCode::NOT_FOUND,
            },
            impersonation: ImpersonationConfig {
                query_parameter: "tenant_impersonation".to_string(),
            },
        };
        AppState::new(Arc::new(config), resolver, tokens)
    }

    #[tokio::test]
    async fn create_rejects_empty_slug() {
        let result = create_tenant(
            State(state()),
            Json(NewTenant {
                slug: "  ".to_string(),
                domains: vec![],
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn create_rejects_unnormalizable_domain() {
        let result = create_tenant(
            State(state()),
            Json(NewTenant {
                slug: "acme".to_string(),
                domains: vec!["https://".to_string()],
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn create_then_resolve_roundtrip() {
        let state = state();
        let (status, Json(tenant)) = create_tenant(
            State(state.clone()),
            Json(NewTenant {
                slug: "acme".to_string(),
                domains: vec!["ACME.example.com".to_string()],
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(resolved) = resolve_host(
            State(state),
            Query(ResolveQuery {
                host: "acme.example.com".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(resolved.tenant_id, tenant.id);
        assert_eq!(resolved.slug, "acme");
    }

    #[tokio::test]
    async fn get_tenant_accepts_id_or_slug() {
        let state = state();
        let (_, Json(tenant)) = create_tenant(
            State(state.clone()),
            Json(NewTenant {
                slug: "acme".to_string(),
                domains: vec![],
            }),
        )
        .await
        .unwrap();

        let Json(by_id) = get_tenant(State(state.clone()), Path(tenant.id.to_string()))
            .await
            .unwrap();
        assert_eq!(by_id.id, tenant.id);

        let Json(by_slug) = get_tenant(State(state.clone()), Path("acme".to_string()))
            .await
            .unwrap();
        assert_eq!(by_slug.id, tenant.id);

        let missing = get_tenant(State(state), Path("nope".to_string())).await;
        assert!(matches!(missing, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn resync_unknown_tenant_is_not_found() {
        let result = resync_domains(State(state()), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(ApiError::NotFound)));
    }
}
