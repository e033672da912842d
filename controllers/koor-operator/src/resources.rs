//! Cluster capacity aggregation.

use crate::store::NodeCapacity;
use crds::{Quantity, Resources};
use tracing::debug;

/// Recommended minimum capacity for a Koor Storage Distribution cluster.
pub fn minimum_resources() -> Resources {
    Resources {
        nodes_count: Quantity::from_count(4),
        cpu: Quantity::from_count(19),
        memory: Quantity::from_count(44_000_000_000),
        storage: Quantity::from_count(500_000_000_000),
    }
}

/// Sum node capacities. A node missing a value contributes zero to it.
pub fn aggregate(nodes: &[NodeCapacity]) -> Resources {
    for n in nodes {
        debug!(
            "Node {}: cpu {:?}, memory {:?}, storage {:?}",
            n.name, n.cpu, n.memory, n.ephemeral_storage
        );
    }
    let nodes_count = u64::try_from(nodes.len()).unwrap_or(u64::MAX);
    Resources {
        nodes_count: Quantity::from_count(nodes_count),
        cpu: nodes.iter().filter_map(|n| n.cpu).sum(),
        memory: nodes.iter().filter_map(|n| n.memory).sum(),
        storage: nodes.iter().filter_map(|n| n.ephemeral_storage).sum(),
    }
}

/// True only if every dimension is at or above the minimum.
pub fn meets_minimum(resources: &Resources) -> bool {
    let minimum = minimum_resources();
    resources.nodes_count >= minimum.nodes_count
        && resources.cpu >= minimum.cpu
        && resources.memory >= minimum.memory
        && resources.storage >= minimum.storage
}

/// Kubelet version reported by the first node that has one.
pub fn kube_version(nodes: &[NodeCapacity]) -> Option<String> {
    nodes.iter().find_map(|n| n.kube_version.clone())
}
