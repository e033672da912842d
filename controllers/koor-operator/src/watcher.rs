//! Kubernetes resource watcher.
//!
//! Drives the reconciler from a kube_runtime::Controller on KoorCluster
//! objects. Node changes requeue every known KoorCluster, since capacity is
//! aggregated across the whole cluster.

use crate::backoff::BackoffTracker;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::store::ClusterRef;
use crds::KoorCluster;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::Api;
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Shared state handed to every reconcile call
pub struct Context {
    pub reconciler: Reconciler,
    pub backoff: BackoffTracker,
    pub metrics: Arc<Metrics>,
}

/// Watch KoorCluster objects until shutdown is signalled.
pub async fn watch_koor_clusters(
    clusters: Api<KoorCluster>,
    nodes: Api<Node>,
    ctx: Arc<Context>,
) -> Result<(), ControllerError> {
    info!("Starting KoorCluster watcher");

    // Debounce batches bursts of events (status writes, node heartbeats)
    // into one pass per object.
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    let controller = Controller::new(clusters, watcher::Config::default());
    let known = controller.store();

    controller
        .with_config(controller_config)
        .watches(nodes, watcher::Config::default(), move |node: Node| {
            debug!("Node {:?} changed, requeueing KoorClusters", node.metadata.name);
            known
                .state()
                .iter()
                .map(|cluster| ObjectRef::from_obj(cluster.as_ref()))
                .collect::<Vec<_>>()
        })
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((object, _)) => debug!("Reconciled KoorCluster {}", object),
                Err(e) => error!("KoorCluster controller error: {}", e),
            }
        })
        .await;

    info!("KoorCluster watcher stopped");
    Ok(())
}

async fn reconcile(cluster: Arc<KoorCluster>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = ClusterRef::from_cluster(&cluster)?;
    ctx.metrics.reconciliations.inc();

    let outcome = ctx.reconciler.reconcile(&key).await;
    ctx.metrics
        .scheduled_jobs
        .set(i64::try_from(ctx.reconciler.scheduled_jobs()).unwrap_or(i64::MAX));

    let outcome = outcome?;
    debug!("KoorCluster {} reconcile outcome: {:?}", key, outcome);
    ctx.backoff.reset(&key.to_string());
    Ok(Action::await_change())
}

fn error_policy(cluster: Arc<KoorCluster>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    ctx.metrics.reconcile_failures.inc();
    let key = match ClusterRef::from_cluster(&cluster) {
        Ok(key) => key.to_string(),
        Err(_) => format!("{:?}", cluster.metadata.name),
    };
    let delay = ctx.backoff.next_delay(&key);
    error!(
        "Reconciliation of KoorCluster {} failed: {}; retrying in {}s",
        key,
        error,
        delay.as_secs()
    );
    Action::requeue(delay)
}
