//! Helm client errors

use thiserror::Error;

/// Errors that can occur when driving the Helm CLI
#[derive(Debug, Error)]
pub enum HelmError {
    /// Helm exited with a non-zero status
    #[error("helm {command} failed: {stderr}")]
    Command {
        /// Subcommand that failed (e.g. "upgrade")
        command: String,
        /// Trimmed standard error output
        stderr: String,
    },

    /// Spawning helm or talking to its pipes failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Values could not be rendered or parsed as YAML
    #[error("Values error: {0}")]
    Values(#[from] serde_yaml::Error),

    /// Release does not exist
    #[error("Release not found: {0}")]
    ReleaseNotFound(String),
}

/// Errors from looking up a path in a release value tree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// No value at the path
    #[error("no value at {0}")]
    NotFound(String),

    /// Value at the path is not a string
    #[error("value at {0} is not a string")]
    NotAString(String),
}
