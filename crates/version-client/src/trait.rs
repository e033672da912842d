//! VersionClient trait for mocking

use crate::error::VersionError;
use crate::models::Component;
use crds::{DetailedVersion, ProductVersions};

/// Latest-version lookups against a version service
#[async_trait::async_trait]
pub trait VersionClient: Send + Sync {
    /// Latest published version of `component`, given what is deployed now.
    async fn latest_version(
        &self,
        endpoint: &str,
        component: Component,
        current: &ProductVersions,
    ) -> Result<DetailedVersion, VersionError>;
}
