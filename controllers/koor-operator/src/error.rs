//! Controller-specific error types.
//!
//! Upstream library errors are wrapped so every reconcile step returns the
//! same error type to the watcher's error policy.

use crds::ScheduleError;
use helm_client::HelmError;
use kube::Error as KubeError;
use thiserror::Error;
use version_client::VersionError;

/// Errors that can occur in the Koor operator.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Helm invocation failed
    #[error("Helm error: {0}")]
    Helm(#[from] HelmError),

    /// Version service lookup failed
    #[error("Version service error: {0}")]
    Version(#[from] VersionError),

    /// Chart values could not be rendered
    #[error("Values error: {0}")]
    Values(#[from] serde_yaml::Error),

    /// Named entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Schedule string rejected
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleError),

    /// An external call did not finish in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// HTTP server failed
    #[error("Server error: {0}")]
    Server(String),
}
