//! Version service client errors

use thiserror::Error;

/// Errors that can occur when querying the version service
#[derive(Debug, Error)]
pub enum VersionError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Version service returned an error
    #[error("Version service error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No current versions to report
    #[error("current versions is empty")]
    EmptyVersions,

    /// The response carried no entry for the component
    #[error("no {0} version in response")]
    MissingComponent(String),
}
