//! KoorCluster CRD
//!
//! Declares a Koor Storage Distribution (Rook/Ceph) installation in a namespace.
//! The controller converges the operator and cluster Helm releases, reports
//! cluster capacity and tracks upgrade notifications in the status.

use crate::quantity::Quantity;
use crate::schedule::{parse_schedule, DEFAULT_SCHEDULE};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Finalizer guarding Helm release teardown.
pub const KOOR_CLUSTER_FINALIZER: &str = "storage.koor.tech/finalizer";

/// Default version service endpoint.
pub const DEFAULT_VERSIONS_ENDPOINT: &str = "versions.koor.tech";

/// Default Ceph image repository used when pinning an upgrade.
pub const DEFAULT_CEPH_IMAGE_REPOSITORY: &str = "quay.io/ceph/ceph";

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "storage.koor.tech",
    version = "v1alpha1",
    kind = "KoorCluster",
    namespaced,
    status = "KoorClusterStatus",
    shortname = "kc",
    printcolumn = r#"{"name":"Meets Minimum", "type":"boolean", "jsonPath":".status.meetsMinimumResources"}"#,
    printcolumn = r#"{"name":"Ceph", "type":"string", "jsonPath":".status.currentVersions.ceph"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KoorClusterSpec {
    /// Consume all devices on all nodes (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_all_devices: Option<bool>,

    /// Enable Prometheus monitoring (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_enabled: Option<bool>,

    /// Enable the Ceph dashboard (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_enabled: Option<bool>,

    /// Deploy the Ceph toolbox (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolbox_enabled: Option<bool>,

    /// Upgrade notification settings
    #[serde(default)]
    pub upgrade_options: UpgradeOptions,

    /// Suffix of the operator Helm release name (default: "ksd")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ksd_release_name: Option<String>,

    /// Suffix of the cluster Helm release name (default: "ksd-cluster")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ksd_cluster_release_name: Option<String>,
}

impl KoorClusterSpec {
    /// Whether all devices should be consumed.
    pub fn use_all_devices(&self) -> bool {
        self.use_all_devices.unwrap_or(true)
    }

    /// Whether monitoring is enabled.
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring_enabled.unwrap_or(true)
    }

    /// Whether the dashboard is enabled.
    pub fn dashboard_enabled(&self) -> bool {
        self.dashboard_enabled.unwrap_or(true)
    }

    /// Whether the toolbox is deployed.
    pub fn toolbox_enabled(&self) -> bool {
        self.toolbox_enabled.unwrap_or(true)
    }

    /// Operator release name suffix.
    pub fn ksd_release_name(&self) -> &str {
        self.ksd_release_name.as_deref().unwrap_or("ksd")
    }

    /// Cluster release name suffix.
    pub fn ksd_cluster_release_name(&self) -> &str {
        self.ksd_cluster_release_name.as_deref().unwrap_or("ksd-cluster")
    }
}

/// What to do when a newer version is published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeMode {
    /// Do not check for new versions
    #[default]
    Disabled,
    /// Record the latest versions in the status
    Notify,
    /// Record the latest versions and roll the cluster chart onto them
    Upgrade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOptions {
    /// Upgrade mode
    #[serde(default)]
    pub mode: UpgradeMode,

    /// Version service endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Cron schedule for version checks
    #[serde(default = "default_schedule")]
    pub schedule: String,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            mode: UpgradeMode::default(),
            endpoint: default_endpoint(),
            schedule: default_schedule(),
        }
    }
}

impl UpgradeOptions {
    /// True unless the mode is `Disabled`.
    pub fn notifications_enabled(&self) -> bool {
        self.mode != UpgradeMode::Disabled
    }
}

fn default_endpoint() -> String {
    DEFAULT_VERSIONS_ENDPOINT.to_string()
}

fn default_schedule() -> String {
    DEFAULT_SCHEDULE.to_string()
}

/// Aggregate capacity across all nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// Number of nodes
    #[serde(default)]
    #[schemars(with = "String")]
    pub nodes_count: Quantity,

    /// Total CPU
    #[serde(default)]
    #[schemars(with = "String")]
    pub cpu: Quantity,

    /// Total memory
    #[serde(default)]
    #[schemars(with = "String")]
    pub memory: Quantity,

    /// Total ephemeral storage
    #[serde(default)]
    #[schemars(with = "String")]
    pub storage: Quantity,
}

/// Versions of the deployed components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductVersions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub koor_operator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceph: Option<String>,
}

impl ProductVersions {
    /// True if no version has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.kube.is_none() && self.koor_operator.is_none() && self.ceph.is_none()
    }
}

/// A published release of one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailedVersion {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_chart: Option<String>,
}

/// Latest published versions, per component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailedProductVersions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub koor_operator: Option<DetailedVersion>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceph: Option<DetailedVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KoorClusterStatus {
    /// Capacity summed over all nodes
    #[serde(default)]
    pub total_resources: Resources,

    /// Whether the capacity meets the recommended minimum
    #[serde(default)]
    pub meets_minimum_resources: bool,

    /// Versions currently deployed
    #[serde(default)]
    pub current_versions: ProductVersions,

    /// Latest versions reported by the version service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_versions: Option<DetailedProductVersions>,
}

/// A field rejected by admission validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: Invalid value: {value:?}: {reason}")]
pub struct ValidationError {
    /// JSON path of the offending field
    pub field: String,
    /// The rejected value
    pub value: String,
    /// Why it was rejected
    pub reason: String,
}

impl KoorCluster {
    /// Validate user input. Only the schedule needs checking, and only when
    /// notifications are enabled.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let options = &self.spec.upgrade_options;
        if !options.notifications_enabled() {
            return Ok(());
        }
        parse_schedule(&options.schedule)
            .map(|_| ())
            .map_err(|e| ValidationError {
                field: "spec.upgradeOptions.schedule".to_string(),
                value: options.schedule.clone(),
                reason: e.to_string(),
            })
    }

    /// True if the teardown finalizer is present.
    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|name| name == KOOR_CLUSTER_FINALIZER))
    }

    /// True once deletion has been requested.
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}
