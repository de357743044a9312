use serde::{Deserialize, Serialize};

use crate::services::ServiceName;

/// Diagnostic snapshot of one tracked service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: ServiceName,
    pub registered: bool,
    pub ready: bool,
}

/// Diagnostic snapshot of the whole registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub services: Vec<ServiceStatus>,
    pub all_ready: bool,
}
