//! Version Service Client
//!
//! Looks up the latest published Koor operator and Ceph releases from a Koor
//! version service, given the versions currently deployed.
//!
//! # Example
//!
//! ```no_run
//! use crds::ProductVersions;
//! use version_client::{Component, VersionClient, VersionServiceClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = VersionServiceClient::new()?;
//! let current = ProductVersions {
//!     ceph: Some("v18.2.1".to_string()),
//!     ..Default::default()
//! };
//! let latest = client
//!     .latest_version("versions.koor.tech", Component::Ceph, &current)
//!     .await?;
//! println!("latest ceph: {} ({:?})", latest.version, latest.image_uri);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod version_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{rpc_url, VersionServiceClient};
pub use error::VersionError;
pub use models::*;
pub use version_trait::VersionClient;
#[cfg(feature = "test-util")]
pub use mock::MockVersionClient;
