//! Version extraction from installed chart releases.

use helm_client::{QueryError, ReleaseDescriptor};
use thiserror::Error;

/// Operator image tag in the operator chart's values
pub const OPERATOR_VERSION_PATH: &str = ".image.tag";

/// Ceph image reference in the cluster chart's values
pub const CEPH_IMAGE_PATH: &str = ".cephClusterSpec.cephVersion.image";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Image reference is not `<repository>:<tag>`
    #[error("malformed image reference {0:?}")]
    Malformed(String),
}

/// Version of the operator deployed by a release.
pub fn operator_version(release: &ReleaseDescriptor) -> Result<String, ExtractionError> {
    Ok(release.query_str(OPERATOR_VERSION_PATH)?.to_string())
}

/// Ceph version deployed by a cluster release: the tag of its Ceph image.
pub fn ceph_version(release: &ReleaseDescriptor) -> Result<String, ExtractionError> {
    image_tag(release.query_str(CEPH_IMAGE_PATH)?).map(str::to_string)
}

/// Tag of a `<repository>:<tag>` image reference.
pub fn image_tag(image: &str) -> Result<&str, ExtractionError> {
    let parts: Vec<&str> = image.split(':').collect();
    match parts.as_slice() {
        [_, tag] if !tag.is_empty() => Ok(*tag),
        _ => Err(ExtractionError::Malformed(image.to_string())),
    }
}
