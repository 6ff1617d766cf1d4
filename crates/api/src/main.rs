//! Tenantry API server

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tenantry_api::{routes, AppState, Config};
use tenantry_resolver::{DomainResolver, PgTenantDirectory};
use tenantry_shared::db;

use tenantry_api::tokens::PgImpersonationTokens;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;

    let directory = Arc::new(PgTenantDirectory::new(pool.clone()));
    let resolver = Arc::new(DomainResolver::new(directory, config.resolver_options()));
    let tokens = Arc::new(PgImpersonationTokens::new(pool));

    let bind_address = config.bind_address.clone();
    let state = AppState::new(Arc::new(config), resolver, tokens);
    let app = routes::create_router(state);

    tracing::info!(address = %bind_address, "tenantry-api listening");
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
