//! Finalizer handling and teardown.

use super::charts::{cluster_release_name, operator_release_name};
use super::Reconciler;
use crate::error::ControllerError;
use crate::store::ClusterRef;
use crds::{KoorCluster, KOOR_CLUSTER_FINALIZER};
use helm_client::HelmError;
use tracing::{debug, info, warn};

impl Reconciler {
    pub(super) async fn add_finalizer(
        &self,
        mut cluster: KoorCluster,
        key: &ClusterRef,
    ) -> Result<KoorCluster, ControllerError> {
        info!("Adding finalizer to KoorCluster {}", key);
        cluster
            .metadata
            .finalizers
            .get_or_insert_with(Vec::new)
            .push(KOOR_CLUSTER_FINALIZER.to_string());
        self.call("add finalizer", self.store.update(&cluster)).await
    }

    /// Uninstall the cluster release, then the operator release, then drop
    /// the finalizer. Uninstall failures are logged; the finalizer is removed
    /// regardless so deletion is never blocked on Helm.
    pub(super) async fn finalize(
        &self,
        mut cluster: KoorCluster,
        key: &ClusterRef,
    ) -> Result<(), ControllerError> {
        if !cluster.has_finalizer() {
            debug!("KoorCluster {} is being deleted without our finalizer", key);
            return Ok(());
        }
        info!("Tearing down KoorCluster {}", key);

        for release in [
            cluster_release_name(&cluster, key),
            operator_release_name(&cluster, key),
        ] {
            match self
                .call("uninstall release", self.charts.uninstall(&release, &key.namespace))
                .await
            {
                Ok(()) => info!("Uninstalled release {}/{}", key.namespace, release),
                Err(ControllerError::Helm(HelmError::ReleaseNotFound(_))) => {
                    debug!("Release {}/{} already gone", key.namespace, release);
                }
                Err(e) => warn!("Failed to uninstall release {}/{}: {}", key.namespace, release, e),
            }
        }

        let job_name = key.notification_job_name();
        if self.registry.get(&job_name).is_some() {
            if let Err(e) = self.registry.remove(&job_name) {
                debug!("Notification job {} already removed: {}", job_name, e);
            }
        }

        if let Some(finalizers) = cluster.metadata.finalizers.as_mut() {
            finalizers.retain(|f| f != KOOR_CLUSTER_FINALIZER);
        }
        self.call("remove finalizer", self.store.update(&cluster)).await?;
        info!("Removed finalizer from KoorCluster {}", key);
        Ok(())
    }
}
