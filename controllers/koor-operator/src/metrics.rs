//! Prometheus metrics for the reconcile loop.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Operator metrics, registered under the `koor_operator` prefix
pub struct Metrics {
    registry: Registry,
    pub reconciliations: IntCounter,
    pub reconcile_failures: IntCounter,
    pub scheduled_jobs: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("koor_operator".to_string()), None)?;

        let reconciliations =
            IntCounter::new("reconciliations_total", "KoorCluster reconcile passes")?;
        let reconcile_failures = IntCounter::new(
            "reconcile_failures_total",
            "KoorCluster reconcile passes that returned an error",
        )?;
        let scheduled_jobs = IntGauge::new(
            "scheduled_notification_jobs",
            "Registered upgrade notification schedules",
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(reconcile_failures.clone()))?;
        registry.register(Box::new(scheduled_jobs.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            reconcile_failures,
            scheduled_jobs,
        })
    }

    /// Metrics in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
