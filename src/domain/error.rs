use thiserror::Error;

/// Rule violations raised while validating commands against the domain
/// model, before anything touches storage.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("no such {entity}")]
    NotFound { entity: &'static str },
    #[error("rejected: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
