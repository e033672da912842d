//! Koor Operator
//!
//! Installs and maintains Koor Storage Distribution clusters described by
//! KoorCluster objects:
//! - converges the Rook operator and Ceph cluster Helm releases
//! - reports aggregate node capacity against the recommended minimum
//! - checks a version service on a cron schedule for newer releases

mod backoff;
mod config;
mod controller;
mod cron_registry;
mod error;
mod metrics;
mod reconciler;
mod resources;
mod server;
mod store;
mod values;
mod versions;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube and reqwest both pull in rustls; pin the process-wide provider.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        info!("rustls crypto provider already installed");
    }

    info!("Starting Koor Operator");

    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Helm: {}", config.helm_binary);
    info!("  Chart repository: {} ({})", config.chart_repo.name, config.chart_repo.url);
    info!("  Call timeout: {}s", config.call_timeout.as_secs());

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
