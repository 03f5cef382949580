use std::sync::Arc;

use anyhow::Context;

use labstock_api::config::{AppConfig, DEV_JWT_SECRET};
use labstock_infra::{Catalog, InMemoryCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    labstock_observability::init(config.log_format);

    let jwt_secret = config.jwt_secret.clone().unwrap_or_else(|| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        DEV_JWT_SECRET.to_string()
    });

    let catalog = match &config.catalog_path {
        Some(path) => InMemoryCatalog::from_path(path)
            .with_context(|| format!("failed to load catalog from {}", path.display()))?,
        None => {
            tracing::warn!("LABSTOCK_CATALOG_PATH not set; every room and item will be unknown");
            InMemoryCatalog::new()
        }
    };
    tracing::info!(
        rooms = catalog.room_count(),
        items = catalog.item_count(),
        "catalog loaded"
    );
    let catalog: Arc<dyn Catalog> = Arc::new(catalog);

    let services = Arc::new(labstock_api::app::services::build_services(
        catalog,
        config.ledger,
    ));
    let app = labstock_api::app::build_app(jwt_secret, services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
