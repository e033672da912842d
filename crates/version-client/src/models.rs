//! Version service data models
//!
//! JSON bodies of the `api.v1.VersionService/Operator` RPC.

use crds::{DetailedVersion, ProductVersions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A component whose latest version can be looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    KoorOperator,
    Ceph,
}

impl Component {
    /// Every component, in lookup order
    pub const ALL: [Component; 2] = [Component::KoorOperator, Component::Ceph];
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Component::KoorOperator => "koor-operator",
            Component::Ceph => "ceph",
        })
    }
}

/// Versions currently deployed, as sent to the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestVersions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub koor_operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ksd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceph: Option<String>,
}

impl From<&ProductVersions> for RequestVersions {
    fn from(versions: &ProductVersions) -> Self {
        Self {
            koor_operator: versions.koor_operator.clone(),
            ksd: None,
            ceph: versions.ceph.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRequest {
    pub versions: RequestVersions,
}

/// Latest versions as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestVersions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub koor_operator: Option<DetailedVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ksd: Option<DetailedVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceph: Option<DetailedVersion>,
}

impl LatestVersions {
    /// Entry for one component
    pub fn get(&self, component: Component) -> Option<&DetailedVersion> {
        match component {
            Component::KoorOperator => self.koor_operator.as_ref(),
            Component::Ceph => self.ceph.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorResponse {
    #[serde(default)]
    pub versions: LatestVersions,
}

/// Error body of a failed RPC
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
