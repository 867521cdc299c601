//! Validation gateway server
//!
//! Main entry point for the HTTP gateway.

use std::{path::PathBuf, sync::Arc, time::Duration};

use application::ports::CachePort;
use infrastructure::{
    AppConfig, CorrelatedHttpClient, MokaCache, MokaCacheConfig, RedbCache, TwoTierCache,
    init_logging,
};
use presentation_http::{
    GatewayReloader, GatewaySnapshot, routes, spawn_config_reload_handler, state::AppState,
    tasks::spawn_cache_cleanup_task,
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

/// Environment variable naming the configuration file
const CONFIG_PATH_ENV: &str = "VALIDATION_GATEWAY_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(infrastructure::config::DEFAULT_CONFIG_FILE), PathBuf::from);

    let config = AppConfig::load_from(&config_path)?;
    init_logging(&config.logging)?;

    info!("Validation gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = %config.server.port,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    // Profile cache: bounded local tier in front of the redb shared tier
    let local = Arc::new(MokaCache::with_config(MokaCacheConfig {
        max_capacity_mb: config.cache.local_max_capacity_mb,
    }));
    let shared = Arc::new(match &config.cache.shared_path {
        Some(path) => RedbCache::new(path)?,
        None => RedbCache::in_memory()?,
    });
    let cache: Arc<dyn CachePort> = Arc::new(TwoTierCache::with_ceiling(
        local,
        shared.clone(),
        config.cache.local_ceiling(),
    ));

    let client = CorrelatedHttpClient::with_config(config.upstream.client_config())?;

    let snapshot = GatewaySnapshot::from_config(&config, &client, cache.clone()).map_err(|e| {
        error!(error = %e, "Invalid gateway configuration");
        e
    })?;
    let state = AppState::new(snapshot, cache, client);

    let _cleanup = spawn_cache_cleanup_task(shared, None);
    let _reloader = spawn_config_reload_handler(GatewayReloader::new(state.clone(), config_path));

    let app = routes::create_router(state);

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Gateway listening on http://{}", addr);
    info!("SIGHUP for config reload is enabled (Unix only)");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs.unwrap_or(30));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }

    info!("Waiting up to {:?} for connections to close", timeout);
}
