use std::sync::Arc;

use anyhow::Context;
use common_auth::TokenCodec;
use mock_api::articles::ArticleRepository;
use mock_api::config::load_server_config;
use mock_api::credentials::{
    CredentialStore, CredentialVerifier, InMemoryCredentialStore, PgCredentialStore,
};
use mock_api::{build_router, AppState};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_server_config().context("Failed to load configuration")?;

    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .context("Failed to connect to DATABASE_URL")?;
            let store = PgCredentialStore::new(pool);
            store.migrate().await.context("Failed to apply users migration")?;
            info!("using postgres credential store");
            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set; using in-memory credential store");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let credentials = CredentialVerifier::new(store)?;
    credentials
        .seed_default_admin()
        .await
        .context("Failed to seed default admin account")?;

    let addr = config.socket_addr();
    info!(
        %addr,
        prefix = %config.prefix,
        environment = config.environment.as_str(),
        access_ttl_seconds = config.tokens.access.ttl_seconds(),
        refresh_ttl_seconds = config.tokens.refresh.ttl_seconds(),
        "starting mock-api"
    );

    let state = AppState::new(
        config,
        TokenCodec::default(),
        credentials,
        ArticleRepository::seeded(),
    )?;
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("server started on: http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
