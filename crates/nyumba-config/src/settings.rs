use std::path::PathBuf;
use std::time::Duration;

/// Timing knobs for the readiness coordinator.
///
/// Defaults match the deployed behavior: a 200ms readiness sweep bounded by a
/// 15s hard stop, step waits for the sequenced bring-up, and a 100ms poll for
/// the promise-style waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorTimings {
    pub poll_interval: Duration,
    pub monitor_timeout: Duration,
    pub backend_wait: Duration,
    pub auth_wait: Duration,
    pub aggregate_wait: Duration,
    pub wait_poll: Duration,
}

impl Default for CoordinatorTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            monitor_timeout: Duration::from_secs(15),
            backend_wait: Duration::from_secs(5),
            auth_wait: Duration::from_secs(3),
            aggregate_wait: Duration::from_secs(5),
            wait_poll: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub timings: CoordinatorTimings,
    /// Where the durable session blob lives. None keeps it in memory only.
    pub durable_path: Option<PathBuf>,
    /// Optional YAML seed file for the local backend's listings.
    pub seed_path: Option<PathBuf>,
}
