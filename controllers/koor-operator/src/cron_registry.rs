//! Named cron jobs.
//!
//! Each entry owns a tokio task that sleeps until the next fire time of its
//! schedule and then runs the job. Removing an entry aborts its task, so no
//! further firings happen once `remove` returns.

use crate::error::ControllerError;
use chrono::Utc;
use crds::{parse_schedule, ParsedSchedule};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A job body; called once per firing
pub type Job = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Name-to-schedule registry of recurring jobs
pub trait ScheduleRegistry: Send + Sync {
    /// Schedule string of the entry, if registered
    fn get(&self, name: &str) -> Option<String>;

    /// Register `job` under `name`. An existing entry of the same name is
    /// replaced and stops firing.
    fn add(&self, name: &str, schedule: &str, job: Job) -> Result<(), ControllerError>;

    /// Stop and forget the entry. Fails with `NotFound` if absent.
    fn remove(&self, name: &str) -> Result<(), ControllerError>;

    /// Number of registered entries
    fn len(&self) -> usize;
}

struct CronEntry {
    schedule: String,
    task: JoinHandle<()>,
}

/// Registry backed by one tokio task per entry
pub struct CronRegistry {
    entries: Mutex<HashMap<String, CronEntry>>,
    runtime: Handle,
}

impl CronRegistry {
    /// Create a registry bound to the current tokio runtime.
    pub fn new() -> Result<Self, ControllerError> {
        let runtime = Handle::try_current().map_err(|e| {
            ControllerError::InvalidConfig(format!("cron registry needs a tokio runtime: {e}"))
        })?;
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            runtime,
        })
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CronEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScheduleRegistry for CronRegistry {
    fn get(&self, name: &str) -> Option<String> {
        self.entries().get(name).map(|entry| entry.schedule.clone())
    }

    fn add(&self, name: &str, schedule: &str, job: Job) -> Result<(), ControllerError> {
        let parsed = parse_schedule(schedule)?;
        let task = self.runtime.spawn(run_entry(name.to_string(), parsed, job));

        let previous = self.entries().insert(
            name.to_string(),
            CronEntry {
                schedule: schedule.to_string(),
                task,
            },
        );
        if let Some(previous) = previous {
            debug!("Replacing cron entry {}", name);
            previous.task.abort();
        }
        info!("Scheduled {} with {:?}", name, schedule);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), ControllerError> {
        let entry = self
            .entries()
            .remove(name)
            .ok_or_else(|| ControllerError::NotFound(format!("cron entry {name}")))?;
        entry.task.abort();
        info!("Unscheduled {}", name);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries().len()
    }
}

impl Drop for CronRegistry {
    fn drop(&mut self) {
        for entry in self.entries().values() {
            entry.task.abort();
        }
    }
}

async fn run_entry(name: String, schedule: ParsedSchedule, job: Job) {
    let mut last_fire = Utc::now();
    loop {
        let now = Utc::now().max(last_fire);
        let Some(next) = schedule.next_after(now) else {
            warn!("Schedule {:?} of {} never fires again", schedule.source(), name);
            return;
        };
        tokio::time::sleep((next - Utc::now()).to_std().unwrap_or_default()).await;
        last_fire = next;
        debug!("Firing {}", name);
        job().await;
    }
}
