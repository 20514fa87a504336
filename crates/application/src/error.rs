use domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("publish failed: {0}")]
    Publish(String),
}

impl ApplicationError {
    pub fn publish(message: impl Into<String>) -> Self {
        ApplicationError::Publish(message.into())
    }
}
