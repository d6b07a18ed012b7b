//! Change Tracker
//!
//! Watches Deployments, ConfigMaps, Secrets, Services, Ingresses,
//! StatefulSets, DaemonSets, CronJobs and Jobs across all namespaces,
//! records operator-meaningful changes in SQLite and announces
//! modifications and deletions on Slack.

mod backoff;
mod config;
mod controller;
mod error;
mod notifier;
mod policy;
mod recorder;
mod retention;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::TrackerConfig;
use crate::controller::Coordinator;
use crate::error::ControllerError;
use crate::notifier::Notifier;
use crate::recorder::EventRecorder;
use event_store::EventStore;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // kube and reqwest both use rustls; pick the provider before either builds a client.
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting Change Tracker");

    let config = TrackerConfig::from_env()?;
    config.log_summary();

    let store =
        Arc::new(EventStore::open(&config.db_path)?.with_stats_ttl(config.stats_cache_ttl));

    let notifier =
        Notifier::from_webhook(config.slack_webhook_url.as_deref(), config.notify_timeout)?;
    if notifier.enabled() {
        if let Err(e) = notifier.test_connection().await {
            warn!("Slack connectivity test failed (notifications stay enabled): {}", e);
        }
    }

    let client = Client::try_default().await?;

    let recorder = Arc::new(EventRecorder::new(store.clone(), notifier));
    let mut coordinator = Coordinator::new(recorder, config.resync_interval);
    coordinator.start(client);
    coordinator.spawn_retention(store, config.retention_days, config.cleanup_interval);

    info!("Change Tracker running");
    shutdown_signal().await;

    if let Err(e) = coordinator.stop(config.shutdown_timeout).await {
        warn!("Unclean shutdown: {}", e);
    }
    info!("Change Tracker stopped");

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
