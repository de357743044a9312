pub mod coordinator;
pub mod error;
pub mod services;
pub mod status;

pub use coordinator::{OnReadyGuard, ReadinessCoordinator, ReadyEvent};
pub use error::ReadyError;
pub use services::{AuthService, ServiceHandle, ServiceName, UiService};
pub use status::{ServiceStatus, StatusReport};
