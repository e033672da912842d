//! Helm data models

use crate::error::QueryError;
use serde::Deserialize;
use serde_json::Value;

/// A chart repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    /// Local repository alias (e.g. "koor-release")
    pub name: String,
    /// Repository URL
    pub url: String,
}

/// Everything needed to install or upgrade one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    pub release_name: String,
    /// Chart reference, `<repo>/<chart>`
    pub chart_name: String,
    pub namespace: String,
    pub create_namespace: bool,
    /// Apply CRD changes shipped in the chart's `crds/` directory
    pub upgrade_crds: bool,
    /// Values overriding the chart defaults, as YAML
    pub values_yaml: String,
}

/// An installed release and its effective values
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseDescriptor {
    pub name: String,
    pub namespace: String,
    pub revision: u64,
    pub chart_version: Option<String>,
    /// Chart defaults merged with the user-supplied values
    pub values: Value,
}

impl ReleaseDescriptor {
    /// Create a descriptor for a release with the given effective values.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, values: Value) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            revision: 1,
            chart_version: None,
            values,
        }
    }

    /// Look up a dotted path such as `.image.tag`.
    ///
    /// A path of `.` returns the whole tree.
    pub fn query(&self, path: &str) -> Result<&Value, QueryError> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.values, |node, segment| {
                let child = match node {
                    Value::Object(map) => map.get(segment),
                    Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                    _ => None,
                };
                child
                    .filter(|value| !value.is_null())
                    .ok_or_else(|| QueryError::NotFound(path.to_string()))
            })
    }

    /// Like [`query`](Self::query) but requires a string value.
    pub fn query_str(&self, path: &str) -> Result<&str, QueryError> {
        self.query(path)?
            .as_str()
            .ok_or_else(|| QueryError::NotAString(path.to_string()))
    }
}

/// Recursively merge `overlay` into `base`. Objects merge key by key; any
/// other overlay value replaces the base value.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Release document printed by `helm upgrade --install -o json`
#[derive(Debug, Deserialize)]
pub(crate) struct HelmRelease {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub chart: Option<HelmChart>,
    #[serde(default)]
    pub config: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HelmChart {
    #[serde(default)]
    pub metadata: Option<HelmChartMetadata>,
    #[serde(default)]
    pub values: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HelmChartMetadata {
    #[serde(default)]
    pub version: Option<String>,
}

impl From<HelmRelease> for ReleaseDescriptor {
    fn from(release: HelmRelease) -> Self {
        let (chart_version, mut values) = match release.chart {
            Some(chart) => (
                chart.metadata.and_then(|m| m.version),
                chart.values.unwrap_or_else(|| Value::Object(Default::default())),
            ),
            None => (None, Value::Object(Default::default())),
        };
        if let Some(config) = release.config {
            merge_values(&mut values, config);
        }
        Self {
            name: release.name,
            namespace: release.namespace,
            revision: release.version,
            chart_version,
            values,
        }
    }
}
