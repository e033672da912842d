//! Object store and node inventory seams.
//!
//! The reconciler only talks to Kubernetes through these traits so that it
//! can be exercised against in-memory fakes.

use crate::error::ControllerError;
use crds::{KoorCluster, Quantity};
use k8s_openapi::api::core::v1::Node;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use std::fmt;
use tracing::warn;

/// Namespace and name of a KoorCluster
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterRef {
    pub namespace: String,
    pub name: String,
}

impl ClusterRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Reference to an object read from the API server
    pub fn from_cluster(cluster: &KoorCluster) -> Result<Self, ControllerError> {
        let namespace = cluster.namespace().ok_or_else(|| {
            ControllerError::InvalidConfig(format!(
                "KoorCluster {} has no namespace",
                cluster.name_any()
            ))
        })?;
        Ok(Self::new(namespace, cluster.name_any()))
    }

    /// Registry key of this cluster's notification job
    pub fn notification_job_name(&self) -> String {
        format!("notification/{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Read and write access to KoorCluster objects
#[async_trait::async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch an object; `Ok(None)` if it does not exist
    async fn get(&self, key: &ClusterRef) -> Result<Option<KoorCluster>, ControllerError>;

    /// Replace the object's metadata and spec
    async fn update(&self, cluster: &KoorCluster) -> Result<KoorCluster, ControllerError>;

    /// Persist the object's status
    async fn update_status(&self, cluster: &KoorCluster) -> Result<KoorCluster, ControllerError>;

    /// Every KoorCluster in scope
    async fn list(&self) -> Result<Vec<KoorCluster>, ControllerError>;
}

/// Capacity reported by one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeCapacity {
    pub name: String,
    pub cpu: Option<Quantity>,
    pub memory: Option<Quantity>,
    pub ephemeral_storage: Option<Quantity>,
    /// Kubelet version, e.g. "v1.30.2"
    pub kube_version: Option<String>,
}

/// Lists the nodes in the cluster
#[async_trait::async_trait]
pub trait NodeInventory: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<NodeCapacity>, ControllerError>;
}

/// ClusterStore backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
    namespace: Option<String>,
}

impl KubeClusterStore {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    fn api(&self, namespace: &str) -> Api<KoorCluster> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl ClusterStore for KubeClusterStore {
    async fn get(&self, key: &ClusterRef) -> Result<Option<KoorCluster>, ControllerError> {
        Ok(self.api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn update(&self, cluster: &KoorCluster) -> Result<KoorCluster, ControllerError> {
        let key = ClusterRef::from_cluster(cluster)?;
        Ok(self
            .api(&key.namespace)
            .replace(&key.name, &PostParams::default(), cluster)
            .await?)
    }

    async fn update_status(&self, cluster: &KoorCluster) -> Result<KoorCluster, ControllerError> {
        let key = ClusterRef::from_cluster(cluster)?;
        let patch = json!({ "status": cluster.status });
        Ok(self
            .api(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }

    async fn list(&self) -> Result<Vec<KoorCluster>, ControllerError> {
        let api: Api<KoorCluster> = match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        Ok(api.list(&ListParams::default()).await?.items)
    }
}

/// NodeInventory backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeNodeInventory {
    api: Api<Node>,
}

impl KubeNodeInventory {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait::async_trait]
impl NodeInventory for KubeNodeInventory {
    async fn list_nodes(&self) -> Result<Vec<NodeCapacity>, ControllerError> {
        let nodes = self.api.list(&ListParams::default()).await?;
        Ok(nodes.items.iter().map(node_capacity).collect())
    }
}

/// Extract capacity from a Node. Unparseable quantities are logged and
/// treated as absent.
pub fn node_capacity(node: &Node) -> NodeCapacity {
    let name = node.name_any();
    let status = node.status.as_ref();
    let capacity = status.and_then(|s| s.capacity.as_ref());
    let quantity = |key: &str| {
        let raw = &capacity?.get(key)?.0;
        match raw.parse::<Quantity>() {
            Ok(q) => Some(q),
            Err(e) => {
                warn!("Ignoring {} capacity {:?} on node {}: {}", key, raw, name, e);
                None
            }
        }
    };

    NodeCapacity {
        cpu: quantity("cpu"),
        memory: quantity("memory"),
        ephemeral_storage: quantity("ephemeral-storage"),
        kube_version: status
            .and_then(|s| s.node_info.as_ref())
            .map(|info| info.kubelet_version.clone())
            .filter(|v| !v.is_empty()),
        name,
    }
}
