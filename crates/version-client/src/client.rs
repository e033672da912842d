//! Version service client
//!
//! Speaks the Connect unary protocol with JSON bodies: a POST to
//! `<endpoint>/api.v1.VersionService/Operator`.

use crate::error::VersionError;
use crate::models::{Component, LatestVersions, OperatorRequest, OperatorResponse, RpcError};
use crate::version_trait::VersionClient;
use crds::{DetailedVersion, ProductVersions};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const OPERATOR_RPC_PATH: &str = "/api.v1.VersionService/Operator";

/// Version service client
#[derive(Debug, Clone)]
pub struct VersionServiceClient {
    client: Client,
}

impl VersionServiceClient {
    /// Create a new client with a 30 second request timeout
    pub fn new() -> Result<Self, VersionError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }

    /// Ask the service for the latest version of every component.
    pub async fn operator_versions(
        &self,
        endpoint: &str,
        current: &ProductVersions,
    ) -> Result<LatestVersions, VersionError> {
        if current.is_empty() {
            return Err(VersionError::EmptyVersions);
        }

        let url = rpc_url(endpoint);
        debug!("Querying latest versions from {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Connect-Protocol-Version", "1")
            .json(&OperatorRequest {
                versions: current.into(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<RpcError>(&body)
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or(body);
            return Err(VersionError::Api(format!(
                "connecting to endpoint {endpoint} failed: {status} - {message}"
            )));
        }

        let parsed: OperatorResponse = serde_json::from_str(&body)?;
        Ok(parsed.versions)
    }
}

#[async_trait::async_trait]
impl VersionClient for VersionServiceClient {
    async fn latest_version(
        &self,
        endpoint: &str,
        component: Component,
        current: &ProductVersions,
    ) -> Result<DetailedVersion, VersionError> {
        let latest = self.operator_versions(endpoint, current).await?;
        latest
            .get(component)
            .cloned()
            .ok_or_else(|| VersionError::MissingComponent(component.to_string()))
    }
}

/// Full RPC URL for an endpoint. Bare host names default to https.
pub fn rpc_url(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{base}{OPERATOR_RPC_PATH}")
    } else {
        format!("https://{base}{OPERATOR_RPC_PATH}")
    }
}
