//! Main controller implementation.
//!
//! Builds the reconciler from its production backends, restores notification
//! schedules and then runs the watcher next to the HTTP server.

use crate::backoff::BackoffTracker;
use crate::config::Config;
use crate::cron_registry::CronRegistry;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::{Reconciler, Settings};
use crate::server::{self, ServerState};
use crate::store::{KubeClusterStore, KubeNodeInventory};
use crate::watcher::{self, Context};
use crds::KoorCluster;
use helm_client::HelmClient;
use k8s_openapi::api::core::v1::Node;
use kube::{Api, Client};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use version_client::VersionServiceClient;

/// Koor operator: KoorCluster watcher plus probe/metrics/admission server.
pub struct Controller {
    watcher: JoinHandle<Result<(), ControllerError>>,
    server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Connects to the cluster and starts all tasks.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing Koor operator");

        let kube_client = Client::try_default().await?;
        let metrics = Arc::new(
            Metrics::new().map_err(|e| ControllerError::Server(format!("metrics registry: {e}")))?,
        );
        let registry = Arc::new(CronRegistry::new()?);
        let versions = VersionServiceClient::new()?;

        let reconciler = Reconciler::new(
            Arc::new(KubeClusterStore::new(kube_client.clone(), config.namespace.clone())),
            Arc::new(KubeNodeInventory::new(kube_client.clone())),
            Arc::new(HelmClient::new(config.helm_binary.clone())),
            Arc::new(versions),
            registry,
            Settings {
                chart_repo: config.chart_repo.clone(),
                call_timeout: config.call_timeout,
            },
        );

        match reconciler.restore_schedules().await {
            Ok(count) => info!("Restored {} notification schedule(s)", count),
            Err(e) => warn!("Could not restore notification schedules: {}", e),
        }
        metrics
            .scheduled_jobs
            .set(i64::try_from(reconciler.scheduled_jobs()).unwrap_or(i64::MAX));

        let ready = Arc::new(AtomicBool::new(false));
        let server = tokio::spawn(server::serve(
            config.server_addr,
            ServerState {
                metrics: Arc::clone(&metrics),
                ready: Arc::clone(&ready),
            },
        ));

        let clusters: Api<KoorCluster> = match &config.namespace {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };
        let nodes: Api<Node> = Api::all(kube_client);
        let ctx = Arc::new(Context {
            reconciler,
            backoff: BackoffTracker::new(),
            metrics,
        });
        let watcher = tokio::spawn(watcher::watch_koor_clusters(clusters, nodes, ctx));

        ready.store(true, Ordering::SeqCst);
        info!("Koor operator initialized");
        Ok(Self { watcher, server })
    }

    /// Runs until the watcher stops or the server fails.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Koor operator running");
        tokio::select! {
            result = self.watcher => finish("KoorCluster watcher", result),
            result = self.server => finish("HTTP server", result),
        }
    }
}

fn finish(
    task: &str,
    result: Result<Result<(), ControllerError>, tokio::task::JoinError>,
) -> Result<(), ControllerError> {
    match result {
        Ok(Ok(())) => {
            info!("{} exited", task);
            Ok(())
        }
        Ok(Err(e)) => {
            error!("{} failed: {}", task, e);
            Err(e)
        }
        Err(e) => {
            error!("{} panicked: {}", task, e);
            Err(ControllerError::Watch(format!("{task} task failed: {e}")))
        }
    }
}
