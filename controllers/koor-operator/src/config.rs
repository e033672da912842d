//! Operator configuration, read from environment variables.

use crate::error::ControllerError;
use helm_client::RepoEntry;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_CHART_REPO_NAME: &str = "koor-release";
pub const DEFAULT_CHART_REPO_URL: &str = "https://charts.koor.tech/release";
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace to watch, or all namespaces
    pub namespace: Option<String>,
    /// helm executable
    pub helm_binary: String,
    /// Repository hosting the Koor charts
    pub chart_repo: RepoEntry,
    /// Upper bound on any single external call
    pub call_timeout: Duration,
    /// Listen address for probes, metrics and admission
    pub server_addr: SocketAddr,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let call_timeout_secs = match lookup("CALL_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ControllerError::InvalidConfig(format!("CALL_TIMEOUT_SECS={raw:?}: {e}"))
            })?,
            None => DEFAULT_CALL_TIMEOUT_SECS,
        };
        if call_timeout_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "CALL_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());
        let server_addr = server_addr.parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("SERVER_ADDR={server_addr:?}: {e}"))
        })?;

        Ok(Self {
            namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty()),
            helm_binary: lookup("HELM_BINARY").unwrap_or_else(|| "helm".to_string()),
            chart_repo: RepoEntry {
                name: lookup("CHART_REPO_NAME").unwrap_or_else(|| DEFAULT_CHART_REPO_NAME.to_string()),
                url: lookup("CHART_REPO_URL").unwrap_or_else(|| DEFAULT_CHART_REPO_URL.to_string()),
            },
            call_timeout: Duration::from_secs(call_timeout_secs),
            server_addr,
        })
    }
}
