use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(#[from] nyumba_backend::BackendError),

    #[error("durable store error: {message}")]
    Durable { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
