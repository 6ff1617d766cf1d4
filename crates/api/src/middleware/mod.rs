//! Request middleware
//!
//! Pipeline order (outermost first): impersonation activation → context
//! gate → scope guards → handler. The scope guards reject before any
//! downstream handler runs; the context gate publishes a task-local
//! binding scoped to the request, gone on every exit path.

pub mod context;
pub mod impersonation;
pub mod scope;


pub use context::{
    current_landlord, current_tenant, require_context, ActiveLandlord, ResolvedContext,
};
pub use impersonation::activate_impersonation;
pub use scope::{enforce_scope, scope_guard, ScopeKind, ScopeOutcome};
