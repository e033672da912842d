//! Helm chart convergence: the Rook operator chart, then the cluster chart.

use super::Reconciler;
use crate::error::ControllerError;
use crate::store::ClusterRef;
use crate::values;
use crate::versions;
use crds::{KoorCluster, KoorClusterStatus};
use helm_client::{ChartSpec, ReleaseDescriptor};
use tracing::{info, warn};

pub const OPERATOR_CHART: &str = "rook-ceph";
pub const CLUSTER_CHART: &str = "rook-ceph-cluster";

/// `<namespace>-<ksdReleaseName>`
pub fn operator_release_name(cluster: &KoorCluster, key: &ClusterRef) -> String {
    format!("{}-{}", key.namespace, cluster.spec.ksd_release_name())
}

/// `<namespace>-<ksdClusterReleaseName>`
pub fn cluster_release_name(cluster: &KoorCluster, key: &ClusterRef) -> String {
    format!("{}-{}", key.namespace, cluster.spec.ksd_cluster_release_name())
}

impl Reconciler {
    /// Install or upgrade both releases and record the deployed versions.
    /// The cluster chart is skipped if the operator chart fails.
    pub(super) async fn reconcile_charts(
        &self,
        cluster: &KoorCluster,
        key: &ClusterRef,
        status: &mut KoorClusterStatus,
    ) -> Result<(), ControllerError> {
        let repo = &self.settings.chart_repo;
        self.call("add chart repository", self.charts.add_or_update_repo(repo))
            .await?;
        self.call("update chart repositories", self.charts.update_repos())
            .await?;

        let operator = self
            .install(ChartSpec {
                release_name: operator_release_name(cluster, key),
                chart_name: format!("{}/{OPERATOR_CHART}", repo.name),
                namespace: key.namespace.clone(),
                create_namespace: true,
                upgrade_crds: true,
                values_yaml: values::operator_values(cluster)?,
            })
            .await?;
        match versions::operator_version(&operator) {
            Ok(version) => status.current_versions.koor_operator = Some(version),
            Err(e) => warn!("Could not read operator version from release {}: {}", operator.name, e),
        }

        let ceph_cluster = self
            .install(ChartSpec {
                release_name: cluster_release_name(cluster, key),
                chart_name: format!("{}/{CLUSTER_CHART}", repo.name),
                namespace: key.namespace.clone(),
                create_namespace: true,
                upgrade_crds: true,
                values_yaml: values::cluster_values(cluster)?,
            })
            .await?;
        match versions::ceph_version(&ceph_cluster) {
            Ok(version) => status.current_versions.ceph = Some(version),
            Err(e) => warn!("Could not read Ceph version from release {}: {}", ceph_cluster.name, e),
        }

        Ok(())
    }

    async fn install(&self, chart: ChartSpec) -> Result<ReleaseDescriptor, ControllerError> {
        info!(
            "Installing or upgrading {} as release {}/{}",
            chart.chart_name, chart.namespace, chart.release_name
        );
        self.call("install chart", self.charts.install_or_upgrade(&chart))
            .await
    }
}
