use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;
use tripweave_itinerary::{DocumentExporter, LinkSharer, SqliteRepository, StoreRegistry};
use tripweave_shared::State;

use crate::config::Config;
use crate::provider::{GatewayClient, MapsClient};
use crate::routes::AppState;

/// Wires the repository, the store registry and the upstream clients.
pub fn build_state(config: Config, read_pool: SqlitePool, write_pool: SqlitePool) -> Result<AppState> {
    let repository = Arc::new(SqliteRepository::new(State {
        read_db: read_pool.clone(),
        write_db: write_pool,
    }));
    let registry = Arc::new(StoreRegistry::new(
        repository,
        config.planner.store_settings(),
    ));

    let providers = &config.providers;
    let timeout = Duration::from_secs(providers.request_timeout_secs);
    let maps = Arc::new(MapsClient::new(
        providers.maps_url.to_owned(),
        providers.maps_api_key.to_owned(),
        timeout,
    )?);
    let gateway = Arc::new(GatewayClient::new(
        &providers.gateway_url,
        providers.gateway_api_key.to_owned(),
        timeout,
    )?);
    let sharer = Arc::new(LinkSharer::new(&providers.public_base_url)?);

    if providers.maps_api_key.is_empty() {
        tracing::warn!("No maps API key configured, geocoding and routing will be rejected");
    }

    Ok(AppState {
        config,
        registry,
        pool: read_pool,
        geocoder: maps.clone(),
        directions: maps,
        optimizer: gateway.clone(),
        generator: gateway,
        exporter: Arc::new(DocumentExporter),
        sharer,
    })
}

pub async fn serve(config: Config, host_override: Option<String>, port_override: Option<u16>) -> Result<()> {
    tracing::info!("Starting tripweave server...");

    let host = host_override.unwrap_or(config.server.host.to_owned());
    let port = port_override.unwrap_or(config.server.port);

    let write_pool = crate::db::create_write_pool(&config.database.url).await?;
    tripweave_db::migrate(&write_pool).await?;
    let read_pool =
        crate::db::create_read_pool(&config.database.url, config.database.max_connections).await?;

    let state = build_state(config, read_pool.clone(), write_pool.clone())?;
    let registry = state.registry.clone();
    let eviction = registry.spawn_eviction();
    let app = crate::create_app(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eviction.abort();
    let flushed = registry.flush().await;
    tracing::info!(flushed, "Saved pending itinerary changes");

    tracing::info!("Closing database pools...");
    read_pool.close().await;
    write_pool.close().await;

    tracing::info!("Graceful shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Starting graceful shutdown...");
}
