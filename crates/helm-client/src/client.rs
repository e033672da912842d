//! Helm CLI client
//!
//! Runs the `helm` binary as a child process. Values are passed on stdin and
//! release state is read back with `--output json`.

use crate::chart_trait::ChartClient;
use crate::error::HelmError;
use crate::models::{ChartSpec, HelmRelease, ReleaseDescriptor, RepoEntry};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Helm CLI client
#[derive(Debug, Clone)]
pub struct HelmClient {
    binary: String,
}

impl HelmClient {
    /// Create a client that runs the given helm executable
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Path or name of the helm executable
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run helm and return its stdout.
    ///
    /// The child is killed if the returned future is dropped, so callers can
    /// bound a call with a timeout.
    async fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<String, HelmError> {
        debug!("Running {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(HelmError::Command {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl ChartClient for HelmClient {
    async fn add_or_update_repo(&self, repo: &RepoEntry) -> Result<(), HelmError> {
        self.run(&["repo", "add", &repo.name, &repo.url, "--force-update"], None)
            .await?;
        Ok(())
    }

    async fn update_repos(&self) -> Result<(), HelmError> {
        self.run(&["repo", "update"], None).await?;
        Ok(())
    }

    async fn install_or_upgrade(&self, chart: &ChartSpec) -> Result<ReleaseDescriptor, HelmError> {
        // Reject bad values before helm sees them.
        serde_yaml::from_str::<serde_yaml::Value>(&chart.values_yaml)?;

        let mut args = vec![
            "upgrade",
            "--install",
            chart.release_name.as_str(),
            chart.chart_name.as_str(),
            "--namespace",
            chart.namespace.as_str(),
            "--values",
            "-",
            "--output",
            "json",
        ];
        if chart.create_namespace {
            args.push("--create-namespace");
        }
        // Charts that template their CRDs upgrade them with the release;
        // helm itself only applies crds/ on first install.
        if !chart.upgrade_crds {
            args.push("--skip-crds");
        }

        let stdout = self.run(&args, Some(&chart.values_yaml)).await?;
        let release: HelmRelease = serde_json::from_str(&stdout)?;
        debug!(
            "Release {}/{} at revision {}",
            release.namespace, release.name, release.version
        );
        Ok(release.into())
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<(), HelmError> {
        match self
            .run(&["uninstall", release_name, "--namespace", namespace], None)
            .await
        {
            Err(HelmError::Command { stderr, .. }) if stderr.contains("not found") => {
                Err(HelmError::ReleaseNotFound(format!("{namespace}/{release_name}")))
            }
            other => other.map(|_| ()),
        }
    }
}
