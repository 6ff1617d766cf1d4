//! Shared application state

use std::sync::Arc;

use tenantry_resolver::DomainResolver;

use crate::config::Config;
use crate::tokens::ImpersonationTokens;

/// State shared across all request handlers and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: Arc<DomainResolver>,
    pub tokens: Arc<dyn ImpersonationTokens>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        resolver: Arc<DomainResolver>,
        tokens: Arc<dyn ImpersonationTokens>,
    ) -> Self {
        Self {
            config,
            resolver,
            tokens,
        }
    }
}
