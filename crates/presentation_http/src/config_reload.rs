//! Hot-reloadable gateway configuration
//!
//! On SIGHUP the configuration file and the response override document are
//! read again and a new [`GatewaySnapshot`] is built. Only a fully valid
//! snapshot replaces the running one; otherwise the previous snapshot stays
//! in place. Requests already in flight finish on the snapshot they started
//! with.

use std::path::{Path, PathBuf};

use infrastructure::AppConfig;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::state::{AppState, GatewaySnapshot};

/// Rebuilds and swaps the gateway snapshot from a configuration file
#[derive(Debug, Clone)]
pub struct GatewayReloader {
    state: AppState,
    config_path: PathBuf,
    /// Notifier for snapshot change events
    notify: watch::Sender<u64>,
    /// Receiver for snapshot change events
    receiver: watch::Receiver<u64>,
}

impl GatewayReloader {
    /// Create a reloader for the given state and configuration file
    #[must_use]
    pub fn new(state: AppState, config_path: impl Into<PathBuf>) -> Self {
        let (notify, receiver) = watch::channel(0);
        Self {
            state,
            config_path: config_path.into(),
            notify,
            receiver,
        }
    }

    /// Configuration file read on reload
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Reload configuration and swap the snapshot
    ///
    /// Returns `true` if the reload was successful
    pub fn reload(&self) -> bool {
        let config = match AppConfig::load_from(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %self.config_path.display(), error = %e, "Failed to read configuration");
                return false;
            },
        };

        match GatewaySnapshot::from_config(&config, &self.state.client, self.state.cache.clone()) {
            Ok(snapshot) => {
                let routes = snapshot.routes().len();
                let previous = self.state.swap(snapshot);
                info!(
                    old_routes = previous.routes().len(),
                    new_routes = routes,
                    "Gateway configuration reloaded"
                );
                let version = *self.notify.borrow() + 1;
                if self.notify.send(version).is_err() {
                    warn!("No reload receivers active");
                }
                true
            },
            Err(e) => {
                error!(error = %e, "Rejected configuration, keeping previous snapshot");
                false
            },
        }
    }

    /// Subscribe to reload notifications
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.receiver.clone()
    }
}

/// Spawn a background task that listens for SIGHUP and reloads the gateway
#[cfg(unix)]
pub fn spawn_config_reload_handler(reloader: GatewayReloader) -> GatewayReloader {
    use tokio::signal::unix::{SignalKind, signal};

    let handle = reloader.clone();
    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to install SIGHUP handler: {}", e);
                return;
            },
        };

        loop {
            sighup.recv().await;
            info!("Received SIGHUP, reloading configuration");
            if !handle.reload() {
                warn!("Configuration reload failed, keeping previous configuration");
            }
        }
    });

    reloader
}

/// No-op on non-Unix systems
#[cfg(not(unix))]
pub fn spawn_config_reload_handler(reloader: GatewayReloader) -> GatewayReloader {
    warn!("SIGHUP config reload not supported on this platform");
    reloader
}
