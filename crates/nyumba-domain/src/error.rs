use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown listing kind: {0}")]
    UnknownListingKind(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("invalid listing id: {0}")]
    InvalidListingId(String),
}
