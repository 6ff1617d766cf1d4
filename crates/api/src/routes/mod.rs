//! API routes

pub mod health;
pub mod tenants;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{activate_impersonation, require_context, scope_guard};
use crate::state::AppState;

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Tenant-scoped routes run the full pipeline: impersonation activation,
    // then the context gate, then the scope guards
    let tenant_scoped = Router::new()
        .route("/whoami", get(tenants::whoami))
        .layer(middleware::from_fn_with_state(state.clone(), scope_guard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_context,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            activate_impersonation,
        ));

    // Admin/control-plane routes resolve nothing and carry no scope
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/tenants", post(tenants::create_tenant))
        .route("/tenants/:id", get(tenants::get_tenant))
        .route("/tenants/:id/resync-domains", post(tenants::resync_domains))
        .route("/resolve", get(tenants::resolve_host))
        .merge(tenant_scoped)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
