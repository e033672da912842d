//! Mock ChartClient for unit testing
//!
//! Records every call in order and returns scripted release values, so tests
//! can assert on install and teardown ordering without a helm binary.

use crate::chart_trait::ChartClient;
use crate::error::HelmError;
use crate::models::{ChartSpec, ReleaseDescriptor, RepoEntry};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartCall {
    AddRepo(String),
    UpdateRepos,
    InstallOrUpgrade {
        release_name: String,
        chart_name: String,
        namespace: String,
    },
    Uninstall {
        release_name: String,
        namespace: String,
    },
}

/// Mock ChartClient for testing
#[derive(Clone, Default)]
pub struct MockChartClient {
    calls: Arc<Mutex<Vec<ChartCall>>>,
    /// Effective values returned per release name
    values: Arc<Mutex<HashMap<String, Value>>>,
    /// Last values YAML submitted per release name
    submitted: Arc<Mutex<HashMap<String, String>>>,
    failing_installs: Arc<Mutex<HashSet<String>>>,
    failing_uninstalls: Arc<Mutex<HashSet<String>>>,
    fail_repo: Arc<Mutex<bool>>,
}

impl MockChartClient {
    /// Create a mock with no scripted releases
    pub fn new() -> Self {
        Self::default()
    }

    /// Values reported back when `release_name` is installed
    pub fn set_release_values(&self, release_name: &str, values: Value) {
        self.values
            .lock()
            .unwrap()
            .insert(release_name.to_string(), values);
    }

    /// Make installs of `release_name` fail
    pub fn fail_install(&self, release_name: &str) {
        self.failing_installs
            .lock()
            .unwrap()
            .insert(release_name.to_string());
    }

    /// Make uninstalls of `release_name` fail
    pub fn fail_uninstall(&self, release_name: &str) {
        self.failing_uninstalls
            .lock()
            .unwrap()
            .insert(release_name.to_string());
    }

    /// Make repository operations fail
    pub fn fail_repo(&self) {
        *self.fail_repo.lock().unwrap() = true;
    }

    /// All calls so far, oldest first
    pub fn calls(&self) -> Vec<ChartCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Release names passed to install_or_upgrade, in order
    pub fn installed_releases(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChartCall::InstallOrUpgrade { release_name, .. } => Some(release_name),
                _ => None,
            })
            .collect()
    }

    /// Release names passed to uninstall, in order
    pub fn uninstalled_releases(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChartCall::Uninstall { release_name, .. } => Some(release_name),
                _ => None,
            })
            .collect()
    }

    /// Values YAML most recently submitted for a release
    pub fn submitted_values(&self, release_name: &str) -> Option<String> {
        self.submitted.lock().unwrap().get(release_name).cloned()
    }

    fn record(&self, call: ChartCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn repo_result(&self, command: &str) -> Result<(), HelmError> {
        if *self.fail_repo.lock().unwrap() {
            return Err(HelmError::Command {
                command: command.to_string(),
                stderr: "repository unreachable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChartClient for MockChartClient {
    async fn add_or_update_repo(&self, repo: &RepoEntry) -> Result<(), HelmError> {
        self.record(ChartCall::AddRepo(repo.name.clone()));
        self.repo_result("repo")
    }

    async fn update_repos(&self) -> Result<(), HelmError> {
        self.record(ChartCall::UpdateRepos);
        self.repo_result("repo")
    }

    async fn install_or_upgrade(&self, chart: &ChartSpec) -> Result<ReleaseDescriptor, HelmError> {
        self.record(ChartCall::InstallOrUpgrade {
            release_name: chart.release_name.clone(),
            chart_name: chart.chart_name.clone(),
            namespace: chart.namespace.clone(),
        });
        self.submitted
            .lock()
            .unwrap()
            .insert(chart.release_name.clone(), chart.values_yaml.clone());

        if self.failing_installs.lock().unwrap().contains(&chart.release_name) {
            return Err(HelmError::Command {
                command: "upgrade".to_string(),
                stderr: format!("failed to install {}", chart.release_name),
            });
        }

        let values = self
            .values
            .lock()
            .unwrap()
            .get(&chart.release_name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        Ok(ReleaseDescriptor::new(
            chart.release_name.clone(),
            chart.namespace.clone(),
            values,
        ))
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<(), HelmError> {
        self.record(ChartCall::Uninstall {
            release_name: release_name.to_string(),
            namespace: namespace.to_string(),
        });
        if self.failing_uninstalls.lock().unwrap().contains(release_name) {
            return Err(HelmError::Command {
                command: "uninstall".to_string(),
                stderr: format!("failed to uninstall {release_name}"),
            });
        }
        Ok(())
    }
}
