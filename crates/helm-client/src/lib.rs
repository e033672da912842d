//! Helm Client
//!
//! Installs, upgrades and removes Helm chart releases by driving the `helm`
//! CLI, and exposes each release's effective values for inspection.
//!
//! # Example
//!
//! ```no_run
//! use helm_client::{ChartClient, ChartSpec, HelmClient, RepoEntry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let helm = HelmClient::new("helm");
//! helm.add_or_update_repo(&RepoEntry {
//!     name: "koor-release".to_string(),
//!     url: "https://charts.koor.tech/release".to_string(),
//! })
//! .await?;
//! helm.update_repos().await?;
//!
//! let release = helm
//!     .install_or_upgrade(&ChartSpec {
//!         release_name: "rook-ceph-ksd".to_string(),
//!         chart_name: "koor-release/rook-ceph".to_string(),
//!         namespace: "rook-ceph".to_string(),
//!         create_namespace: true,
//!         upgrade_crds: true,
//!         values_yaml: "monitoring:\n  enabled: true\n".to_string(),
//!     })
//!     .await?;
//! println!("operator image tag: {}", release.query_str(".image.tag")?);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod chart_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use chart_trait::ChartClient;
pub use client::HelmClient;
pub use error::{HelmError, QueryError};
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::{ChartCall, MockChartClient};
