//! Context-required gate
//!
//! Resolves the request's Host header to a tenant before any downstream
//! handler runs. The resolved context is published two ways: as a request
//! extension for handlers, and as a task-local binding for collaborators
//! that cannot see the request. The binding is scoped to the request's
//! future, so concurrent requests never observe each other's context and
//! the binding is dropped on every exit path, including panic and
//! cancellation.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use tenantry_shared::Tenant;

use crate::error::reject;
use crate::state::AppState;

/// The identities resolved for one request
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    pub tenant: Option<Tenant>,
    pub landlord: Option<Tenant>,
}

/// Landlord identity attached by the operator-auth layer, picked up by the
/// gate so landlord scope binding runs alongside tenant binding.
#[derive(Debug, Clone)]
pub struct ActiveLandlord(pub Tenant);

tokio::task_local! {
    static CURRENT_CONTEXT: ResolvedContext;
}

/// Tenant resolved for the request running on the current task, if any.
pub fn current_tenant() -> Option<Tenant> {
    CURRENT_CONTEXT
        .try_with(|c| c.tenant.clone())
        .ok()
        .flatten()
}

/// Landlord resolved for the request running on the current task, if any.
pub fn current_landlord() -> Option<Tenant> {
    CURRENT_CONTEXT
        .try_with(|c| c.landlord.clone())
        .ok()
        .flatten()
}

/// Reject requests whose host does not resolve to a tenant.
pub async fn require_context(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();

    let Some(tenant) = state.resolver.resolve_tenant(&host).await else {
        tracing::debug!(host = %host, "no tenant context resolved");
        return reject(
            state.config.http.abort_status,
            "UNRESOLVED_HOST",
            format!("no tenant resolved for host '{host}'"),
        );
    };

    let landlord = req.extensions().get::<ActiveLandlord>().map(|l| l.0.clone());
    let context = ResolvedContext {
        tenant: Some(tenant),
        landlord,
    };
    req.extensions_mut().insert(context.clone());

    // Scoped to the downstream future only: the binding is set while that
    // future is polled and gone once it resolves, whatever the exit path
    CURRENT_CONTEXT.scope(context, next.run(req)).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tenantry_shared::TenantId;
    use time::OffsetDateTime;

    fn tenant(slug: &str) -> Tenant {
        Tenant {
            id: TenantId::new(),
            slug: slug.to_string(),
            domains: vec![],
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn context(slug: &str) -> ResolvedContext {
        ResolvedContext {
            tenant: Some(tenant(slug)),
            landlord: None,
        }
    }

    #[tokio::test]
    async fn binding_is_unset_outside_a_request_scope() {
        assert!(current_tenant().is_none());
        assert!(current_landlord().is_none());

        let seen = CURRENT_CONTEXT
            .scope(context("acme"), async { current_tenant().map(|t| t.slug) })
            .await;
        assert_eq!(seen.as_deref(), Some("acme"));

        assert!(current_tenant().is_none());
    }

    #[tokio::test]
    async fn concurrent_bindings_do_not_leak_across_tasks() {
        let a = tokio::spawn(CURRENT_CONTEXT.scope(context("acme"), async {
            tokio::task::yield_now().await;
            current_tenant().map(|t| t.slug)
        }));
        let b = tokio::spawn(CURRENT_CONTEXT.scope(context("beta"), async {
            tokio::task::yield_now().await;
            current_tenant().map(|t| t.slug)
        }));

        assert_eq!(a.await.unwrap().as_deref(), Some("acme"));
        assert_eq!(b.await.unwrap().as_deref(), Some("beta"));
    }
}
