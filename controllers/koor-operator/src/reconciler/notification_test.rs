//! Unit tests for the notification schedule and job

use crate::cron_registry::ScheduleRegistry;
use crate::test_utils::*;
use crds::DetailedVersion;
use serde_json::json;
use version_client::Component;

fn job_name() -> String {
    test_key().notification_job_name()
}

fn detailed(version: &str) -> DetailedVersion {
    DetailedVersion {
        version: version.to_string(),
        image_uri: Some(format!("quay.io/ceph/ceph:{version}")),
        ..Default::default()
    }
}

#[tokio::test]
async fn disabled_cluster_has_no_job() {
    let h = Harness::new();
    h.store.insert(test_cluster());
    h.reconciler.reconcile(&test_key()).await.unwrap();
    assert!(h.registry.calls().is_empty());
    assert_eq!(h.reconciler.scheduled_jobs(), 0);
}

#[tokio::test]
async fn enabled_cluster_is_scheduled_once() {
    let h = Harness::new();
    h.store.insert(notifying_cluster("0 3 * * *"));

    h.reconciler.reconcile(&test_key()).await.unwrap();
    h.reconciler.reconcile(&test_key()).await.unwrap();

    assert_eq!(
        h.registry.calls(),
        vec![RegistryCall::Add {
            name: job_name(),
            schedule: "0 3 * * *".to_string()
        }]
    );
}

#[tokio::test]
async fn schedule_change_replaces_job() {
    let h = Harness::new();
    h.store.insert(notifying_cluster("0 3 * * *"));
    h.reconciler.reconcile(&test_key()).await.unwrap();

    h.store.insert(notifying_cluster("30 4 * * 1"));
    h.reconciler.reconcile(&test_key()).await.unwrap();

    assert_eq!(
        h.registry.calls(),
        vec![
            RegistryCall::Add {
                name: job_name(),
                schedule: "0 3 * * *".to_string()
            },
            RegistryCall::Remove(job_name()),
            RegistryCall::Add {
                name: job_name(),
                schedule: "30 4 * * 1".to_string()
            },
        ]
    );
    assert_eq!(h.reconciler.scheduled_jobs(), 1);
}

#[tokio::test]
async fn disabling_removes_job() {
    let h = Harness::new();
    h.store.insert(notifying_cluster("0 3 * * *"));
    h.reconciler.reconcile(&test_key()).await.unwrap();

    h.store.insert(test_cluster());
    h.reconciler.reconcile(&test_key()).await.unwrap();

    assert_eq!(h.registry.calls().last(), Some(&RegistryCall::Remove(job_name())));
    assert_eq!(h.reconciler.scheduled_jobs(), 0);
}

#[tokio::test]
async fn invalid_schedule_fails_reconcile_but_installs_charts() {
    let h = Harness::new();
    h.store.insert(notifying_cluster("every day"));

    assert!(h.reconciler.reconcile(&test_key()).await.is_err());
    assert_eq!(h.charts.installed_releases().len(), 2);
    assert_eq!(h.reconciler.scheduled_jobs(), 0);
    assert_eq!(h.store.status_writes().len(), 1);
}

#[tokio::test]
async fn job_records_latest_versions() {
    let h = Harness::new();
    h.versions.set_latest(Component::KoorOperator, DetailedVersion {
        version: "v1.12.0".to_string(),
        ..Default::default()
    });
    h.versions.set_latest(Component::Ceph, detailed("v18.2.2"));
    h.store.insert(cluster_with_spec(json!({
        "upgradeOptions": { "mode": "notify", "endpoint": "versions.example.com" }
    })));
    h.reconciler.reconcile(&test_key()).await.unwrap();
    let writes_before = h.store.status_writes().len();

    h.registry.fire(&job_name()).await;

    let latest = h
        .store
        .object(&test_key())
        .unwrap()
        .status
        .unwrap()
        .latest_versions
        .unwrap();
    assert_eq!(latest.koor_operator.unwrap().version, "v1.12.0");
    assert_eq!(latest.ceph, Some(detailed("v18.2.2")));
    assert_eq!(h.store.status_writes().len(), writes_before + 1);
    assert!(h
        .versions
        .calls()
        .iter()
        .all(|(endpoint, _)| endpoint == "versions.example.com"));
}

#[tokio::test]
async fn job_keeps_component_that_fails() {
    let h = Harness::new();
    h.versions.set_latest(Component::Ceph, detailed("v18.2.2"));
    h.versions.fail(Component::KoorOperator, "current versions is empty");
    h.store.insert(notifying_cluster("0 0 * * *"));
    h.reconciler.reconcile(&test_key()).await.unwrap();

    h.registry.fire(&job_name()).await;

    let latest = h
        .store
        .object(&test_key())
        .unwrap()
        .status
        .unwrap()
        .latest_versions
        .unwrap();
    assert_eq!(latest.koor_operator, None);
    assert_eq!(latest.ceph, Some(detailed("v18.2.2")));
}

#[tokio::test]
async fn job_without_answers_writes_nothing() {
    let h = Harness::new();
    h.store.insert(notifying_cluster("0 0 * * *"));
    h.reconciler.reconcile(&test_key()).await.unwrap();
    let writes_before = h.store.status_writes().len();

    h.registry.fire(&job_name()).await;

    assert_eq!(h.store.status_writes().len(), writes_before);
    assert_eq!(h.versions.calls().len(), 2);
}

#[tokio::test]
async fn job_removes_itself_when_cluster_is_gone() {
    let h = Harness::new();
    h.store.insert(notifying_cluster("0 0 * * *"));
    h.reconciler.reconcile(&test_key()).await.unwrap();

    h.store.remove(&test_key());
    h.registry.fire(&job_name()).await;

    assert_eq!(h.reconciler.scheduled_jobs(), 0);
    assert!(h.versions.calls().is_empty());
}

#[tokio::test]
async fn upgrade_mode_pins_latest_ceph_image() {
    let h = Harness::new();
    h.versions.set_latest(Component::Ceph, detailed("v18.2.2"));
    h.store.insert(cluster_with_spec(json!({
        "upgradeOptions": { "mode": "upgrade" }
    })));
    h.reconciler.reconcile(&test_key()).await.unwrap();
    h.registry.fire(&job_name()).await;

    h.reconciler.reconcile(&test_key()).await.unwrap();

    let values: serde_json::Value = serde_yaml::from_str(
        &h.charts
            .submitted_values("rook-ceph-ksd-cluster")
            .unwrap(),
    )
    .unwrap();
    assert_eq!(
        values["cephClusterSpec"]["cephVersion"]["image"],
        json!("quay.io/ceph/ceph:v18.2.2")
    );
}

#[tokio::test]
async fn restore_schedules_registers_existing_clusters() {
    let h = Harness::new();
    h.store.insert(notifying_cluster("0 6 * * *"));

    let restored = h.reconciler.restore_schedules().await.unwrap();

    assert_eq!(restored, 1);
    assert_eq!(h.registry.get(&job_name()).as_deref(), Some("0 6 * * *"));
    assert!(h.charts.calls().is_empty());
}

#[tokio::test]
async fn restore_counts_only_clusters_with_notifications() {
    let h = Harness::new();
    h.store.insert(notifying_cluster("0 6 * * *"));
    let mut quiet = test_cluster();
    quiet.metadata.name = Some("quiet".to_string());
    h.store.insert(quiet);

    let restored = h.reconciler.restore_schedules().await.unwrap();

    assert_eq!(restored, 1);
    assert_eq!(h.registry.len(), 1);
    assert!(h.registry.get(&job_name()).is_some());
}
