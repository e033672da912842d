//! Mock VersionClient for unit testing

use crate::error::VersionError;
use crate::models::Component;
use crate::version_trait::VersionClient;
use crds::{DetailedVersion, ProductVersions};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock VersionClient for testing
///
/// Components without a scripted answer fail with `MissingComponent`.
#[derive(Clone, Default)]
pub struct MockVersionClient {
    answers: Arc<Mutex<HashMap<Component, Result<DetailedVersion, String>>>>,
    calls: Arc<Mutex<Vec<(String, Component)>>>,
}

impl MockVersionClient {
    /// Create a mock with no scripted answers
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer lookups for `component` with `version`
    pub fn set_latest(&self, component: Component, version: DetailedVersion) {
        self.answers.lock().unwrap().insert(component, Ok(version));
    }

    /// Fail lookups for `component` with an API error
    pub fn fail(&self, component: Component, message: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(component, Err(message.to_string()));
    }

    /// (endpoint, component) pairs looked up so far
    pub fn calls(&self) -> Vec<(String, Component)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl VersionClient for MockVersionClient {
    async fn latest_version(
        &self,
        endpoint: &str,
        component: Component,
        _current: &ProductVersions,
    ) -> Result<DetailedVersion, VersionError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), component));
        match self.answers.lock().unwrap().get(&component) {
            Some(Ok(version)) => Ok(version.clone()),
            Some(Err(message)) => Err(VersionError::Api(message.clone())),
            None => Err(VersionError::MissingComponent(component.to_string())),
        }
    }
}
