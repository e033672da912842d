//! Unit tests for KoorCluster reconciliation and teardown

use super::ReconcileOutcome;
use crate::error::ControllerError;
use crate::test_utils::*;
use crds::KOOR_CLUSTER_FINALIZER;
use helm_client::ChartCall;
use serde_json::json;

const OPERATOR_RELEASE: &str = "rook-ceph-ksd";
const CLUSTER_RELEASE: &str = "rook-ceph-ksd-cluster";

fn script_releases(h: &Harness) {
    h.charts
        .set_release_values(OPERATOR_RELEASE, json!({ "image": { "tag": "v1.11.0" } }));
    h.charts.set_release_values(
        CLUSTER_RELEASE,
        json!({ "cephClusterSpec": { "cephVersion": { "image": "quay.io/ceph/ceph:v17.2.6" } } }),
    );
    h.nodes
        .set_nodes((1..=4).map(|i| big_node(&format!("worker-{i}"))).collect());
}

#[tokio::test]
async fn missing_object_is_a_noop() {
    let h = Harness::new();
    let outcome = h.reconciler.reconcile(&test_key()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::NotFound);
    assert!(h.charts.calls().is_empty());
    assert!(h.store.status_writes().is_empty());
}

#[tokio::test]
async fn fetch_failure_is_returned() {
    let h = Harness::new();
    h.store.insert(test_cluster());
    h.store.fail_get();
    assert!(h.reconciler.reconcile(&test_key()).await.is_err());
    assert!(h.charts.calls().is_empty());
}

#[tokio::test]
async fn converges_new_cluster() {
    let h = Harness::new();
    script_releases(&h);
    h.store.insert(test_cluster());

    let outcome = h.reconciler.reconcile(&test_key()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Converged);

    let stored = h.store.object(&test_key()).unwrap();
    assert!(stored.has_finalizer());

    assert_eq!(
        h.charts.calls(),
        vec![
            ChartCall::AddRepo("koor-release".to_string()),
            ChartCall::UpdateRepos,
            ChartCall::InstallOrUpgrade {
                release_name: OPERATOR_RELEASE.to_string(),
                chart_name: "koor-release/rook-ceph".to_string(),
                namespace: "rook-ceph".to_string(),
            },
            ChartCall::InstallOrUpgrade {
                release_name: CLUSTER_RELEASE.to_string(),
                chart_name: "koor-release/rook-ceph-cluster".to_string(),
                namespace: "rook-ceph".to_string(),
            },
        ]
    );

    let status = stored.status.unwrap();
    assert!(status.meets_minimum_resources);
    assert_eq!(status.total_resources.nodes_count.to_string(), "4");
    assert_eq!(status.total_resources.cpu.to_string(), "32");
    assert_eq!(status.total_resources.memory.to_string(), "64Gi");
    assert_eq!(status.current_versions.kube.as_deref(), Some("v1.30.2"));
    assert_eq!(status.current_versions.koor_operator.as_deref(), Some("v1.11.0"));
    assert_eq!(status.current_versions.ceph.as_deref(), Some("v17.2.6"));
    assert_eq!(h.store.status_writes().len(), 1);
}

#[tokio::test]
async fn small_cluster_is_reported_below_minimum() {
    let h = Harness::new();
    h.nodes.set_nodes(vec![big_node("only")]);
    h.store.insert(test_cluster());

    h.reconciler.reconcile(&test_key()).await.unwrap();
    let status = h.store.object(&test_key()).unwrap().status.unwrap();
    assert!(!status.meets_minimum_resources);
    assert_eq!(status.total_resources.nodes_count.to_string(), "1");
}

#[tokio::test]
async fn second_pass_writes_identical_status() {
    let h = Harness::new();
    script_releases(&h);
    h.store.insert(test_cluster());

    h.reconciler.reconcile(&test_key()).await.unwrap();
    h.reconciler.reconcile(&test_key()).await.unwrap();

    let writes = h.store.status_writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0], writes[1]);
    // The finalizer is only added once.
    assert_eq!(h.store.update_count(), 1);
}

#[tokio::test]
async fn release_names_follow_spec_overrides() {
    let h = Harness::new();
    h.store.insert(cluster_with_spec(json!({
        "ksdReleaseName": "op",
        "ksdClusterReleaseName": "storage"
    })));

    h.reconciler.reconcile(&test_key()).await.unwrap();
    assert_eq!(
        h.charts.installed_releases(),
        vec!["rook-ceph-op".to_string(), "rook-ceph-storage".to_string()]
    );
}

#[tokio::test]
async fn submitted_values_reflect_spec() {
    let h = Harness::new();
    h.store.insert(cluster_with_spec(json!({
        "monitoringEnabled": false,
        "useAllDevices": false
    })));

    h.reconciler.reconcile(&test_key()).await.unwrap();

    let operator: serde_json::Value =
        serde_yaml::from_str(&h.charts.submitted_values(OPERATOR_RELEASE).unwrap()).unwrap();
    assert_eq!(operator["monitoring"]["enabled"], json!(false));

    let cluster: serde_json::Value =
        serde_yaml::from_str(&h.charts.submitted_values(CLUSTER_RELEASE).unwrap()).unwrap();
    assert_eq!(cluster["cephClusterSpec"]["storage"]["useAllDevices"], json!(false));
    assert_eq!(cluster["toolbox"]["enabled"], json!(true));
}

#[tokio::test]
async fn chart_failure_still_persists_resources() {
    let h = Harness::new();
    script_releases(&h);
    h.charts.fail_repo();
    h.store.insert(test_cluster());

    let result = h.reconciler.reconcile(&test_key()).await;
    assert!(matches!(result, Err(ControllerError::Helm(_))));
    assert!(h.charts.installed_releases().is_empty());

    let status = h.store.object(&test_key()).unwrap().status.unwrap();
    assert!(status.meets_minimum_resources);
    assert_eq!(status.current_versions.kube.as_deref(), Some("v1.30.2"));
    assert_eq!(status.current_versions.ceph, None);
}

#[tokio::test]
async fn operator_failure_skips_cluster_chart() {
    let h = Harness::new();
    script_releases(&h);
    h.charts.fail_install(OPERATOR_RELEASE);
    h.store.insert(test_cluster());

    assert!(h.reconciler.reconcile(&test_key()).await.is_err());
    assert_eq!(h.charts.installed_releases(), vec![OPERATOR_RELEASE.to_string()]);
    assert_eq!(h.store.status_writes().len(), 1);
}

#[tokio::test]
async fn node_failure_does_not_block_charts() {
    let h = Harness::new();
    script_releases(&h);
    h.nodes.fail();
    h.store.insert(test_cluster());

    assert!(h.reconciler.reconcile(&test_key()).await.is_err());
    assert_eq!(h.charts.installed_releases().len(), 2);
    let status = h.store.object(&test_key()).unwrap().status.unwrap();
    assert_eq!(status.current_versions.koor_operator.as_deref(), Some("v1.11.0"));
}

#[tokio::test(start_paused = true)]
async fn hung_node_listing_times_out_and_charts_still_run() {
    let h = Harness::new();
    script_releases(&h);
    h.nodes.hang();
    h.store.insert(test_cluster());

    let result = h.reconciler.reconcile(&test_key()).await;
    assert!(matches!(result, Err(ControllerError::Timeout(_))), "{result:?}");
    assert_eq!(h.charts.installed_releases().len(), 2);
    assert_eq!(h.store.status_writes().len(), 1);
    let status = h.store.object(&test_key()).unwrap().status.unwrap();
    assert_eq!(status.current_versions.koor_operator.as_deref(), Some("v1.11.0"));
}

#[tokio::test]
async fn unreadable_versions_do_not_fail_reconcile() {
    let h = Harness::new();
    h.charts
        .set_release_values(OPERATOR_RELEASE, json!({ "image": { "repository": "rook/ceph" } }));
    h.charts.set_release_values(
        CLUSTER_RELEASE,
        json!({ "cephClusterSpec": { "cephVersion": { "image": "quay.io/ceph/ceph" } } }),
    );
    h.store.insert(test_cluster());

    let outcome = h.reconciler.reconcile(&test_key()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Converged);
    let status = h.store.object(&test_key()).unwrap().status.unwrap();
    assert_eq!(status.current_versions.koor_operator, None);
    assert_eq!(status.current_versions.ceph, None);
}

#[tokio::test]
async fn teardown_uninstalls_cluster_then_operator() {
    let h = Harness::new();
    h.store.insert(deleting(
        notifying_cluster("0 0 * * *"),
        &[KOOR_CLUSTER_FINALIZER],
    ));

    let outcome = h.reconciler.reconcile(&test_key()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Finalized);
    assert_eq!(
        h.charts.uninstalled_releases(),
        vec![CLUSTER_RELEASE.to_string(), OPERATOR_RELEASE.to_string()]
    );
    assert!(h.charts.installed_releases().is_empty());
    // Last finalizer gone: the object is released.
    assert!(h.store.object(&test_key()).is_none());
}

#[tokio::test]
async fn teardown_removes_notification_job() {
    let h = Harness::new();
    h.store.insert(notifying_cluster("0 0 * * *"));
    h.reconciler.reconcile(&test_key()).await.unwrap();
    assert_eq!(h.reconciler.scheduled_jobs(), 1);

    h.store.insert(deleting(
        notifying_cluster("0 0 * * *"),
        &[KOOR_CLUSTER_FINALIZER],
    ));
    h.reconciler.reconcile(&test_key()).await.unwrap();
    assert_eq!(h.reconciler.scheduled_jobs(), 0);
}

#[tokio::test]
async fn teardown_releases_finalizer_even_if_uninstall_fails() {
    let h = Harness::new();
    h.charts.fail_uninstall(CLUSTER_RELEASE);
    h.store.insert(deleting(
        test_cluster(),
        &[KOOR_CLUSTER_FINALIZER, "example.com/other"],
    ));

    let outcome = h.reconciler.reconcile(&test_key()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Finalized);
    assert_eq!(h.charts.uninstalled_releases().len(), 2);

    let stored = h.store.object(&test_key()).unwrap();
    assert!(!stored.has_finalizer());
    assert_eq!(
        stored.metadata.finalizers,
        Some(vec!["example.com/other".to_string()])
    );
}

#[tokio::test]
async fn deleting_without_our_finalizer_is_left_alone() {
    let h = Harness::new();
    h.store
        .insert(deleting(test_cluster(), &["example.com/other"]));

    let outcome = h.reconciler.reconcile(&test_key()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Finalized);
    assert!(h.charts.calls().is_empty());
    assert_eq!(h.store.update_count(), 0);
}
