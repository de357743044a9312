use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadyError {
    /// A name outside the closed service set. The source silently ignored
    /// these; here they are reported so typos cannot mask a wiring bug.
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("timed out waiting for {service}")]
    Timeout { service: String },
}
