//! Session scope binding
//!
//! Enforces that one session belongs to exactly one tenant (and one
//! landlord) for its lifetime. The first request carrying an active
//! identity binds it; later requests must match or are rejected before any
//! handler runs. This is the session-fixation defense: a session cannot be
//! silently reused across tenants.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use tenantry_shared::TenantId;

use crate::config::SessionConfig;
use crate::error::reject;
use crate::middleware::context::ResolvedContext;
use crate::session::Session;
use crate::state::AppState;

/// Which identity a binding protects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Tenant,
    Landlord,
}

impl ScopeKind {
    fn session_key<'a>(&self, config: &'a SessionConfig) -> &'a str {
        match self {
            ScopeKind::Tenant => &config.tenant_scope_key,
            ScopeKind::Landlord => &config.landlord_scope_key,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScopeKind::Tenant => "tenant",
            ScopeKind::Landlord => "landlord",
        }
    }
}

/// Result of running the binding state machine for one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOutcome {
    /// No session on the request; nothing to enforce
    Skipped,
    /// No active identity; any stored binding was cleared
    Cleared,
    /// First request with an active identity; binding stored
    Bound,
    /// Stored binding matches the active identity
    Verified,
    /// Stored binding differs (or has an unrecognized type); request must
    /// be rejected
    Rejected,
}

/// Run the binding state machine for one scope kind.
///
/// Both sides are coerced to strings before comparison: the stored value
/// may have been serialized as either an integer or a string. Any other
/// stored shape is treated as a mismatch (fail closed). On mismatch the
/// whole session is destroyed when `invalidate_on_mismatch` is set.
pub fn enforce_scope(
    kind: ScopeKind,
    session: Option<&Session>,
    active: Option<TenantId>,
    config: &SessionConfig,
) -> ScopeOutcome {
    let Some(session) = session else {
        return ScopeOutcome::Skipped;
    };
    let key = kind.session_key(config);

    let Some(active) = active else {
        session.forget(key);
        return ScopeOutcome::Cleared;
    };
    let active = active.to_string();

    let Some(stored) = session.get(key) else {
        session.put(key, Value::String(active));
        return ScopeOutcome::Bound;
    };

    let stored = match stored {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => {
            tracing::warn!(scope = kind.label(), "stored scope binding has unrecognized type, treating as mismatch");
            None
        }
    };

    if stored.as_deref() == Some(active.as_str()) {
        return ScopeOutcome::Verified;
    }

    tracing::warn!(scope = kind.label(), "session scope mismatch");
    if config.invalidate_on_mismatch {
        session.invalidate();
    }
    ScopeOutcome::Rejected
}

/// Middleware enforcing both scope bindings against the resolved context.
pub async fn scope_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let session = req.extensions().get::<Session>().cloned();
    let context = req.extensions().get::<ResolvedContext>().cloned();

    let active_tenant = context
        .as_ref()
        .and_then(|c| c.tenant.as_ref())
        .map(|t| t.id);
    let active_landlord = context
        .as_ref()
        .and_then(|c| c.landlord.as_ref())
        .map(|t| t.id);

    for (kind, active) in [
        (ScopeKind::Landlord, active_landlord),
        (ScopeKind::Tenant, active_tenant),
    ] {
        let outcome = enforce_scope(kind, session.as_ref(), active, &state.config.session);
        if outcome == ScopeOutcome::Rejected {
            return reject(
                state.config.session.abort_status,
                "SCOPE_MISMATCH",
                format!("session is already bound to a different {}", kind.label()),
            );
        }
    }

    next.run(req).await
}
