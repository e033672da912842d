//! KoorCluster reconciliation.
//!
//! One reconcile pass converges a single object:
//! 1. Fetch it; a missing object is a no-op.
//! 2. If deletion was requested, tear down its releases and drop the finalizer.
//! 3. Otherwise ensure the finalizer, then run the independent steps
//!    (capacity, charts, notification schedule). A failed step is logged and
//!    remembered while the remaining steps still run.
//! 4. Persist the status once and return the first step error, if any.

mod charts;
mod finalizer;
mod notification;

#[cfg(test)]
mod reconcile_test;
#[cfg(test)]
mod notification_test;

use crate::cron_registry::ScheduleRegistry;
use crate::error::ControllerError;
use crate::resources;
use crate::store::{ClusterRef, ClusterStore, NodeInventory};
use crds::KoorClusterStatus;
use helm_client::{ChartClient, RepoEntry};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use version_client::VersionClient;

/// Reconciler knobs taken from the operator configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub chart_repo: RepoEntry,
    pub call_timeout: Duration,
}

/// What a reconcile pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Object no longer exists
    NotFound,
    /// Object was being deleted and has been released
    Finalized,
    /// Object was converged and its status persisted
    Converged,
}

/// Converges KoorCluster objects.
pub struct Reconciler {
    store: Arc<dyn ClusterStore>,
    nodes: Arc<dyn NodeInventory>,
    charts: Arc<dyn ChartClient>,
    versions: Arc<dyn VersionClient>,
    registry: Arc<dyn ScheduleRegistry>,
    settings: Settings,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        nodes: Arc<dyn NodeInventory>,
        charts: Arc<dyn ChartClient>,
        versions: Arc<dyn VersionClient>,
        registry: Arc<dyn ScheduleRegistry>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            nodes,
            charts,
            versions,
            registry,
            settings,
        }
    }

    /// Number of live notification schedules
    pub fn scheduled_jobs(&self) -> usize {
        self.registry.len()
    }

    /// Reconcile one KoorCluster.
    pub async fn reconcile(&self, key: &ClusterRef) -> Result<ReconcileOutcome, ControllerError> {
        info!("Reconciling KoorCluster {}", key);

        let Some(mut cluster) = self.call("get KoorCluster", self.store.get(key)).await? else {
            debug!("KoorCluster {} not found, nothing to do", key);
            return Ok(ReconcileOutcome::NotFound);
        };

        if cluster.is_deleting() {
            self.finalize(cluster, key).await?;
            return Ok(ReconcileOutcome::Finalized);
        }

        if !cluster.has_finalizer() {
            cluster = self.add_finalizer(cluster, key).await?;
        }

        let mut status = cluster.status.clone().unwrap_or_default();
        let mut first_error = None;

        let result = self.reconcile_resources(&mut status).await;
        note_failure(&mut first_error, key, "resource aggregation", result);

        let result = self.reconcile_charts(&cluster, key, &mut status).await;
        note_failure(&mut first_error, key, "chart convergence", result);

        let result = self.reconcile_notification(&cluster, key);
        note_failure(&mut first_error, key, "notification schedule", result);

        cluster.status = Some(status);
        self.call("update KoorCluster status", self.store.update_status(&cluster))
            .await?;

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("KoorCluster {} converged", key);
                Ok(ReconcileOutcome::Converged)
            }
        }
    }

    /// Re-register notification schedules for every existing KoorCluster and
    /// return how many are live. Run once at startup so jobs are live before
    /// the first reconcile pass.
    pub async fn restore_schedules(&self) -> Result<usize, ControllerError> {
        let clusters = self.call("list KoorClusters", self.store.list()).await?;
        let mut restored = 0;
        for cluster in clusters.iter().filter(|c| !c.is_deleting()) {
            let key = ClusterRef::from_cluster(cluster)?;
            match self.reconcile_notification(cluster, &key) {
                Ok(()) if cluster.spec.upgrade_options.notifications_enabled() => restored += 1,
                Ok(()) => {}
                Err(e) => warn!("Could not restore notification schedule for {}: {}", key, e),
            }
        }
        Ok(restored)
    }

    async fn reconcile_resources(&self, status: &mut KoorClusterStatus) -> Result<(), ControllerError> {
        let nodes = self.call("list nodes", self.nodes.list_nodes()).await?;
        let total = resources::aggregate(&nodes);
        status.meets_minimum_resources = resources::meets_minimum(&total);
        if !status.meets_minimum_resources {
            info!(
                "Cluster capacity {} nodes, {} cpu, {} memory, {} storage is below the recommended minimum",
                total.nodes_count, total.cpu, total.memory, total.storage
            );
        }
        status.total_resources = total;
        if let Some(version) = resources::kube_version(&nodes) {
            status.current_versions.kube = Some(version);
        }
        Ok(())
    }

    /// Run an external call with the configured deadline.
    async fn call<T, E>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, ControllerError>
    where
        ControllerError: From<E>,
    {
        bounded(self.settings.call_timeout, what, call).await
    }
}

/// Bound `call` by `timeout`, converting both failure kinds to ControllerError.
pub(crate) async fn bounded<T, E>(
    timeout: Duration,
    what: &str,
    call: impl Future<Output = Result<T, E>>,
) -> Result<T, ControllerError>
where
    ControllerError: From<E>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(ControllerError::from),
        Err(_) => Err(ControllerError::Timeout(format!(
            "{what} did not finish within {}s",
            timeout.as_secs()
        ))),
    }
}

fn note_failure(
    first_error: &mut Option<ControllerError>,
    key: &ClusterRef,
    step: &str,
    result: Result<(), ControllerError>,
) {
    if let Err(e) = result {
        warn!("KoorCluster {}: {} failed: {}", key, step, e);
        first_error.get_or_insert(e);
    }
}
