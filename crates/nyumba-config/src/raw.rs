use serde::{Deserialize, Serialize};

/// Raw YAML representation of the settings file.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawSettings {
    #[serde(default)]
    pub coordinator: RawCoordinatorTimings,
    pub durable_path: Option<String>,
    pub seed_path: Option<String>,
}

/// Millisecond-valued timing overrides; absent fields keep their defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawCoordinatorTimings {
    pub poll_interval_ms: Option<u64>,
    pub monitor_timeout_ms: Option<u64>,
    pub backend_wait_ms: Option<u64>,
    pub auth_wait_ms: Option<u64>,
    pub aggregate_wait_ms: Option<u64>,
    pub wait_poll_ms: Option<u64>,
}

/// Raw YAML representation of one seed listing.
#[derive(Debug, Deserialize, Serialize)]
pub struct RawListing {
    pub id: String,
    pub title: String,
    pub location: String,
    pub price: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
}
