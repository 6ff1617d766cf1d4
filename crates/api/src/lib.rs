//! Tenantry API Library
//!
//! HTTP surface for the tenancy resolution engine: request middleware
//! (impersonation activation, context gate, session scope guards), the
//! session handle those guards operate on, and the admin routes that manage
//! tenants and their domain index.
//!
//! Session attachment is deliberately left to the embedding deployment: the
//! guards skip entirely when no [`session::Session`] is present on the
//! request.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod tokens;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use session::Session;
pub use state::AppState;
