use std::sync::Arc;

use nyumba_backend::Backend;
use nyumba_domain::AppState;
use nyumba_store::StateStore;
use serde::{Deserialize, Serialize};

use crate::error::ReadyError;

/// The closed set of tracked services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceName {
    Backend,
    State,
    Auth,
    Ui,
}

impl ServiceName {
    pub const ALL: [ServiceName; 4] = [
        ServiceName::Backend,
        ServiceName::State,
        ServiceName::Auth,
        ServiceName::Ui,
    ];

    pub fn parse(s: &str) -> Result<Self, ReadyError> {
        match s {
            "backend" => Ok(ServiceName::Backend),
            "state" => Ok(ServiceName::State),
            "auth" => Ok(ServiceName::Auth),
            "ui" => Ok(ServiceName::Ui),
            other => Err(ReadyError::UnknownService(other.to_string())),
        }
    }
}

impl std::fmt::Display for ServiceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceName::Backend => write!(f, "backend"),
            ServiceName::State => write!(f, "state"),
            ServiceName::Auth => write!(f, "auth"),
            ServiceName::Ui => write!(f, "ui"),
        }
    }
}

/// The application's authentication service as the coordinator sees it.
pub trait AuthService: Send + Sync + 'static {
    /// Whether this service considers its backend usable.
    fn backend_ready(&self) -> bool;

    /// Wire in the backend and state handles.
    fn attach(&self, backend: Arc<dyn Backend>, state: Arc<StateStore>);

    fn is_attached(&self) -> bool;
}

/// The rendering surface as the coordinator sees it.
pub trait UiService: Send + Sync + 'static {
    fn can_render(&self) -> bool;

    /// Wire in the state handle.
    fn attach_state(&self, state: Arc<StateStore>);

    fn has_state(&self) -> bool;

    fn render(&self, state: &AppState);
}

/// A registered service instance. The variant fixes the name, so a
/// name/instance mismatch is unrepresentable.
#[derive(Clone)]
pub enum ServiceHandle {
    Backend(Arc<dyn Backend>),
    State(Arc<StateStore>),
    Auth(Arc<dyn AuthService>),
    Ui(Arc<dyn UiService>),
}

impl ServiceHandle {
    pub fn name(&self) -> ServiceName {
        match self {
            ServiceHandle::Backend(_) => ServiceName::Backend,
            ServiceHandle::State(_) => ServiceName::State,
            ServiceHandle::Auth(_) => ServiceName::Auth,
            ServiceHandle::Ui(_) => ServiceName::Ui,
        }
    }
}
