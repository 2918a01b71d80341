use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use storefront_rs::{
    create_app, init_observability,
    repositories::{
        init_pool, PgCartRepository, PgCatalogRepository, PgUserRepository, SchemaManager,
    },
    services::{AuthService, CartService, CatalogService},
    shutdown_observability, AppServices, Config, Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (basic logging only)
    let config = Config::from_environment().context("failed to load configuration")?;

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint(),
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )?;

    info!("Starting storefront-rs service");
    info!(
        "Service: {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new()?);
    info!("Metrics initialized successfully");

    let pool = init_pool(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    info!("Database pool initialized successfully");

    let schema_manager = Arc::new(SchemaManager::new(pool.clone()));
    if config.database.run_schema_setup {
        let statements = schema_manager
            .ensure_schema()
            .await
            .context("failed to set up database schema")?;
        info!("Database schema ready ({} statements)", statements);
    }

    let catalog_service = Arc::new(
        CatalogService::new(Arc::new(PgCatalogRepository::new(pool.clone())))
            .with_metrics(metrics.clone()),
    );
    let cart_service = Arc::new(
        CartService::new(Arc::new(PgCartRepository::new(pool.clone())))
            .with_metrics(metrics.clone()),
    );
    let auth_service = Arc::new(
        AuthService::new(Arc::new(PgUserRepository::new(pool.clone())))
            .with_metrics(metrics.clone()),
    );
    info!("Services initialized successfully");

    let app = create_app(
        AppServices {
            metrics,
            catalog_service,
            cart_service,
            auth_service,
            schema_manager: config.server.enable_admin.then_some(schema_manager),
        },
        &config.server,
    );

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("invalid STOREFRONT_HOST")?,
        config.server.port,
    );

    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server keeps running until killed
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown_observability().await;
}
