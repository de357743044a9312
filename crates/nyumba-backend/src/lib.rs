pub mod backend;
pub mod error;
pub mod local;

pub use backend::{
    AuthGateway, AuthListener, AuthListeners, AuthWatch, Backend, Collection, DocRecord, Document,
};
pub use error::BackendError;
pub use local::{LocalAuthGateway, LocalBackend};
