use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend not ready")]
    NotReady,

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal backend error: {0}")]
    Internal(String),
}
