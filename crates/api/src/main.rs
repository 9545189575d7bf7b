use std::sync::Arc;

use anyhow::Context;

use stockgate_api::app::{build_app, AppServices};
use stockgate_api::config::ApiConfig;
use stockgate_store::PgInventoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockgate_observability::init();

    let config = ApiConfig::from_env();

    let store = PgInventoryStore::connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;

    let services = Arc::new(AppServices::new(Arc::new(store), &config));
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
