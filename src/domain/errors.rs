use thiserror::Error;

/// Failure surfaced by the session layer.
///
/// Cloneable so one failed fetch can be handed to every subscriber that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Not found: {path}")]
    NotFound { path: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Request to {path} failed with status {status}")]
    Status { status: u16, path: String },
    #[error("Could not decode response: {0}")]
    Decode(String),
    #[error("Request superseded by a newer one")]
    Superseded,
    #[error("Internal error: {0}")]
    Internal(String),
}
