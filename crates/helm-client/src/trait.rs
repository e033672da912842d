//! ChartClient trait for mocking
//!
//! Abstracts Helm so the controller can be unit tested without a cluster or
//! a helm binary. `HelmClient` drives the real CLI; tests use `MockChartClient`.

use crate::error::HelmError;
use crate::models::{ChartSpec, ReleaseDescriptor, RepoEntry};

/// Chart repository and release operations
#[async_trait::async_trait]
pub trait ChartClient: Send + Sync {
    /// Register a chart repository, replacing its URL if the name exists.
    async fn add_or_update_repo(&self, repo: &RepoEntry) -> Result<(), HelmError>;

    /// Refresh the index of every registered repository.
    async fn update_repos(&self) -> Result<(), HelmError>;

    /// Install the release, or upgrade it in place if it already exists.
    async fn install_or_upgrade(&self, chart: &ChartSpec) -> Result<ReleaseDescriptor, HelmError>;

    /// Remove a release.
    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<(), HelmError>;
}
