//! Upgrade notification schedule and the job it runs.

use super::{bounded, Reconciler};
use crate::cron_registry::{Job, JobFuture, ScheduleRegistry};
use crate::error::ControllerError;
use crate::store::{ClusterRef, ClusterStore};
use crds::{DetailedProductVersions, DetailedVersion, KoorCluster};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};
use version_client::{Component, VersionClient};

impl Reconciler {
    /// Make the registry agree with `spec.upgradeOptions`:
    /// disabled means no entry, enabled means exactly one entry carrying the
    /// current schedule.
    pub(super) fn reconcile_notification(
        &self,
        cluster: &KoorCluster,
        key: &ClusterRef,
    ) -> Result<(), ControllerError> {
        let job_name = key.notification_job_name();
        let options = &cluster.spec.upgrade_options;

        match (options.notifications_enabled(), self.registry.get(&job_name)) {
            (false, None) => Ok(()),
            (false, Some(_)) => {
                info!("Upgrade notifications disabled for {}", key);
                self.registry.remove(&job_name)
            }
            (true, Some(current)) if current == options.schedule => Ok(()),
            (true, current) => {
                if current.is_some() {
                    info!("Notification schedule of {} changed to {:?}", key, options.schedule);
                    self.registry.remove(&job_name)?;
                }
                let job = NotificationJob::new(
                    key.clone(),
                    Arc::clone(&self.store),
                    Arc::clone(&self.versions),
                    Arc::downgrade(&self.registry),
                    self.settings.call_timeout,
                );
                self.registry.add(&job_name, &options.schedule, job.into_job())
            }
        }
    }
}

/// Periodic latest-version check for one KoorCluster.
///
/// Holds only the object's reference: every run re-fetches the object so it
/// sees the current endpoint and versions.
pub struct NotificationJob {
    key: ClusterRef,
    store: Arc<dyn ClusterStore>,
    versions: Arc<dyn VersionClient>,
    registry: Weak<dyn ScheduleRegistry>,
    call_timeout: Duration,
}

impl NotificationJob {
    pub fn new(
        key: ClusterRef,
        store: Arc<dyn ClusterStore>,
        versions: Arc<dyn VersionClient>,
        registry: Weak<dyn ScheduleRegistry>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            key,
            store,
            versions,
            registry,
            call_timeout,
        }
    }

    /// Wrap into a registry job.
    pub fn into_job(self) -> Job {
        let job = Arc::new(self);
        Arc::new(move || -> JobFuture {
            let job = Arc::clone(&job);
            Box::pin(async move { job.run().await })
        })
    }

    /// One check. Failures are logged; a component that cannot be looked up
    /// keeps its previous value.
    pub async fn run(&self) {
        let key = &self.key;
        let mut cluster = match bounded(self.call_timeout, "get KoorCluster", self.store.get(key)).await {
            Ok(Some(cluster)) => cluster,
            Ok(None) => {
                info!("KoorCluster {} is gone, removing its notification job", key);
                self.unschedule();
                return;
            }
            Err(e) => {
                warn!("Notification check for {} could not fetch the object: {}", key, e);
                return;
            }
        };

        let endpoint = cluster.spec.upgrade_options.endpoint.clone();
        let mut status = cluster.status.clone().unwrap_or_default();
        let mut latest = status.latest_versions.clone().unwrap_or_default();
        let mut found_any = false;

        for component in Component::ALL {
            let lookup = self
                .versions
                .latest_version(&endpoint, component, &status.current_versions);
            match bounded(self.call_timeout, "version lookup", lookup).await {
                Ok(version) => {
                    info!("Latest {} version for {} is {}", component, key, version.version);
                    set_latest(&mut latest, component, version);
                    found_any = true;
                }
                Err(e) => warn!("Could not fetch latest {} version for {}: {}", component, key, e),
            }
        }

        if !found_any {
            return;
        }
        status.latest_versions = Some(latest);
        cluster.status = Some(status);
        if let Err(e) = bounded(
            self.call_timeout,
            "update KoorCluster status",
            self.store.update_status(&cluster),
        )
        .await
        {
            warn!("Could not record latest versions for {}: {}", key, e);
        }
    }

    fn unschedule(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if let Err(e) = registry.remove(&self.key.notification_job_name()) {
            debug!("Notification job for {} already removed: {}", self.key, e);
        }
    }
}

fn set_latest(latest: &mut DetailedProductVersions, component: Component, version: DetailedVersion) {
    match component {
        Component::KoorOperator => latest.koor_operator = Some(version),
        Component::Ceph => latest.ceph = Some(version),
    }
}
