//! Application configuration

use axum::http::StatusCode;
use std::env;

/// Application configuration loaded from environment variables
///
/// Every tenancy option is coerced defensively at load time so the request
/// path never re-validates config values.
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Tenancy resolution
    pub use_index_table: bool,
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub http: HttpConfig,
    pub impersonation: ImpersonationConfig,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub prefix: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub landlord_scope_key: String,
    pub tenant_scope_key: String,
    pub abort_status: StatusCode,
    pub invalidate_on_mismatch: bool,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub abort_status: StatusCode,
}

#[derive(Debug, Clone)]
pub struct ImpersonationConfig {
    pub query_parameter: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),

            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),

            use_index_table: env_bool("TENANCY_USE_INDEX_TABLE", true),

            cache: CacheConfig {
                // Strict boolean: only the literal "true" enables the cache
                enabled: env::var("TENANCY_CACHE_ENABLED")
                    .map(|v| v == "true")
                    .unwrap_or(false),
                ttl_seconds: env_positive("TENANCY_CACHE_TTL_SECONDS", 60),
                prefix: env::var("TENANCY_CACHE_PREFIX")
                    .unwrap_or_else(|_| "tenancy:domain:tenant:".to_string()),
            },

            session: SessionConfig {
                landlord_scope_key: env::var("TENANCY_SESSION_LANDLORD_SCOPE_KEY")
                    .unwrap_or_else(|_| "tenancy.landlord_id".to_string()),
                tenant_scope_key: env::var("TENANCY_SESSION_TENANT_SCOPE_KEY")
                    .unwrap_or_else(|_| "tenancy.tenant_id".to_string()),
                abort_status: env_status("TENANCY_SESSION_ABORT_STATUS", StatusCode::FORBIDDEN),
                invalidate_on_mismatch: env_bool("TENANCY_SESSION_INVALIDATE_ON_MISMATCH", true),
            },

            http: HttpConfig {
                abort_status: env_status("TENANCY_HTTP_ABORT_STATUS", StatusCode::NOT_FOUND),
            },

            impersonation: ImpersonationConfig {
                query_parameter: env::var("TENANCY_IMPERSONATION_QUERY_PARAMETER")
                    .unwrap_or_else(|_| "tenant_impersonation".to_string()),
            },
        })
    }

    /// Resolver construction options derived from this config
    pub fn resolver_options(&self) -> tenantry_resolver::ResolverOptions {
        let options = tenantry_resolver::ResolverOptions {
            use_index_table: self.use_index_table,
            cache: None,
        };
        if self.cache.enabled {
            options.with_cache(
                std::time::Duration::from_secs(self.cache.ttl_seconds),
                self.cache.prefix.clone(),
            )
        } else {
            options
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_positive(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as u64)
        .unwrap_or(default)
}

fn env_status(name: &str, default: StatusCode) -> StatusCode {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .and_then(|v| StatusCode::from_u16(v).ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
