//! Test utilities for unit testing the reconciler
//!
//! In-memory fakes for the Kubernetes seams plus a harness that wires them
//! to the Helm and version service mocks.

use crate::cron_registry::{Job, ScheduleRegistry};
use crate::error::ControllerError;
use crate::reconciler::{Reconciler, Settings};
use crate::store::{ClusterRef, ClusterStore, NodeCapacity, NodeInventory};
use crds::{KoorCluster, KoorClusterStatus};
use helm_client::{MockChartClient, RepoEntry};
use kube::ResourceExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use version_client::MockVersionClient;

/// ClusterStore over a HashMap keyed by `namespace/name`
#[derive(Default)]
pub struct InMemoryClusterStore {
    objects: Mutex<HashMap<ClusterRef, KoorCluster>>,
    status_writes: Mutex<Vec<KoorClusterStatus>>,
    updates: Mutex<usize>,
    fail_get: AtomicBool,
}

impl InMemoryClusterStore {
    pub fn insert(&self, cluster: KoorCluster) {
        let key = ClusterRef::from_cluster(&cluster).unwrap();
        self.objects.lock().unwrap().insert(key, cluster);
    }

    pub fn object(&self, key: &ClusterRef) -> Option<KoorCluster> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn remove(&self, key: &ClusterRef) {
        self.objects.lock().unwrap().remove(key);
    }

    /// Every status persisted, oldest first
    pub fn status_writes(&self) -> Vec<KoorClusterStatus> {
        self.status_writes.lock().unwrap().clone()
    }

    /// Number of metadata/spec replacements
    pub fn update_count(&self) -> usize {
        *self.updates.lock().unwrap()
    }

    pub fn fail_get(&self) {
        self.fail_get.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ClusterStore for InMemoryClusterStore {
    async fn get(&self, key: &ClusterRef) -> Result<Option<KoorCluster>, ControllerError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(ControllerError::Watch("api server unavailable".to_string()));
        }
        Ok(self.object(key))
    }

    async fn update(&self, cluster: &KoorCluster) -> Result<KoorCluster, ControllerError> {
        let key = ClusterRef::from_cluster(cluster)?;
        *self.updates.lock().unwrap() += 1;
        let mut objects = self.objects.lock().unwrap();
        // The API server drops a deleting object once its last finalizer goes.
        if cluster.is_deleting() && cluster.finalizers().is_empty() {
            objects.remove(&key);
        } else {
            let mut stored = cluster.clone();
            if let Some(existing) = objects.get(&key) {
                stored.status = existing.status.clone();
            }
            objects.insert(key, stored);
        }
        Ok(cluster.clone())
    }

    async fn update_status(&self, cluster: &KoorCluster) -> Result<KoorCluster, ControllerError> {
        let key = ClusterRef::from_cluster(cluster)?;
        let status = cluster.status.clone().unwrap_or_default();
        self.status_writes.lock().unwrap().push(status.clone());
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get_mut(&key)
            .ok_or_else(|| ControllerError::NotFound(key.to_string()))?;
        stored.status = Some(status);
        Ok(stored.clone())
    }

    async fn list(&self) -> Result<Vec<KoorCluster>, ControllerError> {
        Ok(self.objects.lock().unwrap().values().cloned().collect())
    }
}

/// NodeInventory returning a fixed node list
#[derive(Default)]
pub struct StaticNodeInventory {
    nodes: Mutex<Vec<NodeCapacity>>,
    fail: AtomicBool,
    hang: AtomicBool,
}

impl StaticNodeInventory {
    pub fn set_nodes(&self, nodes: Vec<NodeCapacity>) {
        *self.nodes.lock().unwrap() = nodes;
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Make every later listing wait forever
    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl NodeInventory for StaticNodeInventory {
    async fn list_nodes(&self) -> Result<Vec<NodeCapacity>, ControllerError> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ControllerError::Watch("node list failed".to_string()));
        }
        Ok(self.nodes.lock().unwrap().clone())
    }
}

/// A registry operation observed by RecordingRegistry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Add { name: String, schedule: String },
    Remove(String),
}

/// ScheduleRegistry that never fires on its own; tests call `fire`.
#[derive(Default)]
pub struct RecordingRegistry {
    entries: Mutex<HashMap<String, (String, Job)>>,
    calls: Mutex<Vec<RegistryCall>>,
}

impl RecordingRegistry {
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Run the job registered under `name` once
    pub async fn fire(&self, name: &str) {
        let job = self
            .entries
            .lock()
            .unwrap()
            .get(name)
            .map(|(_, job)| Arc::clone(job))
            .expect("job registered");
        job().await;
    }
}

impl ScheduleRegistry for RecordingRegistry {
    fn get(&self, name: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(name)
            .map(|(schedule, _)| schedule.clone())
    }

    fn add(&self, name: &str, schedule: &str, job: Job) -> Result<(), ControllerError> {
        crds::parse_schedule(schedule)?;
        self.calls.lock().unwrap().push(RegistryCall::Add {
            name: name.to_string(),
            schedule: schedule.to_string(),
        });
        self.entries
            .lock()
            .unwrap()
            .insert(name.to_string(), (schedule.to_string(), job));
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), ControllerError> {
        self.calls
            .lock()
            .unwrap()
            .push(RegistryCall::Remove(name.to_string()));
        self.entries
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ControllerError::NotFound(name.to_string()))
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Reconciler wired to in-memory fakes
pub struct Harness {
    pub store: Arc<InMemoryClusterStore>,
    pub nodes: Arc<StaticNodeInventory>,
    pub charts: MockChartClient,
    pub versions: MockVersionClient,
    pub registry: Arc<RecordingRegistry>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryClusterStore::default());
        let nodes = Arc::new(StaticNodeInventory::default());
        let charts = MockChartClient::new();
        let versions = MockVersionClient::new();
        let registry = Arc::new(RecordingRegistry::default());
        let reconciler = Reconciler::new(
            store.clone(),
            nodes.clone(),
            Arc::new(charts.clone()),
            Arc::new(versions.clone()),
            registry.clone(),
            Settings {
                chart_repo: test_repo(),
                call_timeout: Duration::from_secs(5),
            },
        );
        Self {
            store,
            nodes,
            charts,
            versions,
            registry,
            reconciler,
        }
    }
}

pub fn test_repo() -> RepoEntry {
    RepoEntry {
        name: "koor-release".to_string(),
        url: "https://charts.koor.tech/release".to_string(),
    }
}

/// KoorCluster `rook-ceph/koor` with the given spec
pub fn cluster_with_spec(spec: Value) -> KoorCluster {
    serde_json::from_value(json!({
        "apiVersion": "storage.koor.tech/v1alpha1",
        "kind": "KoorCluster",
        "metadata": { "name": "koor", "namespace": "rook-ceph" },
        "spec": spec
    }))
    .unwrap()
}

/// KoorCluster `rook-ceph/koor` with all defaults
pub fn test_cluster() -> KoorCluster {
    cluster_with_spec(json!({}))
}

/// KoorCluster with notifications on the given schedule
pub fn notifying_cluster(schedule: &str) -> KoorCluster {
    cluster_with_spec(json!({
        "upgradeOptions": { "mode": "notify", "schedule": schedule }
    }))
}

/// Mark a cluster as being deleted, carrying `finalizers`
pub fn deleting(mut cluster: KoorCluster, finalizers: &[&str]) -> KoorCluster {
    let meta: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta =
        serde_json::from_value(json!({
            "name": "koor",
            "namespace": "rook-ceph",
            "deletionTimestamp": "2026-01-01T00:00:00Z",
            "finalizers": finalizers
        }))
        .unwrap();
    cluster.metadata = meta;
    cluster
}

pub fn test_key() -> ClusterRef {
    ClusterRef::new("rook-ceph", "koor")
}

/// A node large enough that four of them meet the recommended minimum
pub fn big_node(name: &str) -> NodeCapacity {
    NodeCapacity {
        name: name.to_string(),
        cpu: Some("8".parse().unwrap()),
        memory: Some("16Gi".parse().unwrap()),
        ephemeral_storage: Some("200G".parse().unwrap()),
        kube_version: Some("v1.30.2".to_string()),
    }
}
