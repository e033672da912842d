//! Helm values rendered from a KoorCluster spec.

use crds::{KoorCluster, UpgradeMode, DEFAULT_CEPH_IMAGE_REPOSITORY};
use kube::ResourceExt;
use serde_json::json;

/// Values for the `rook-ceph` operator chart
pub fn operator_values(cluster: &KoorCluster) -> Result<String, serde_yaml::Error> {
    let spec = &cluster.spec;
    let values = json!({
        "monitoring": { "enabled": spec.monitoring_enabled() },
    });
    serde_yaml::to_string(&values)
}

/// Values for the `rook-ceph-cluster` chart
pub fn cluster_values(cluster: &KoorCluster) -> Result<String, serde_yaml::Error> {
    let spec = &cluster.spec;
    let mut values = json!({
        "operatorNamespace": cluster.namespace().unwrap_or_default(),
        "monitoring": {
            "enabled": spec.monitoring_enabled(),
            "createPrometheusRules": spec.monitoring_enabled(),
        },
        "toolbox": { "enabled": spec.toolbox_enabled() },
        "cephClusterSpec": {
            "dashboard": { "enabled": spec.dashboard_enabled() },
            "storage": {
                "useAllNodes": true,
                "useAllDevices": spec.use_all_devices(),
            },
        },
    });

    if let Some(image) = pinned_ceph_image(cluster) {
        values["cephClusterSpec"]["cephVersion"] = json!({ "image": image });
    }
    serde_yaml::to_string(&values)
}

/// In `Upgrade` mode, the latest Ceph image the version service reported.
fn pinned_ceph_image(cluster: &KoorCluster) -> Option<String> {
    if cluster.spec.upgrade_options.mode != UpgradeMode::Upgrade {
        return None;
    }
    let latest = cluster.status.as_ref()?.latest_versions.as_ref()?.ceph.as_ref()?;
    Some(
        latest
            .image_uri
            .clone()
            .unwrap_or_else(|| format!("{DEFAULT_CEPH_IMAGE_REPOSITORY}:{}", latest.version)),
    )
}
