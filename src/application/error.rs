use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::Response;
use thiserror::Error;

use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;

/// Structured diagnostics attached to error responses so the response
/// logging middleware can emit the full cause chain without the handler
/// leaking it to the client.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("resource not found")]
    NotFound,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. })
            | AppError::NotFound
            | AppError::Repo(RepoError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Repo(RepoError::InvalidInput { .. })
            | AppError::Repo(RepoError::Pagination(_)) => StatusCode::BAD_REQUEST,
            AppError::Repo(RepoError::Duplicate { .. })
            | AppError::Repo(RepoError::Integrity { .. }) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Repo(RepoError::Timeout) | AppError::Infra(InfraError::Database { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Repo(RepoError::Persistence(_))
            | AppError::Infra(_)
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. })
            | AppError::NotFound
            | AppError::Repo(RepoError::NotFound) => "Resource not found",
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Repo(RepoError::InvalidInput { .. })
            | AppError::Repo(RepoError::Pagination(_)) => "Request could not be processed",
            AppError::Repo(RepoError::Duplicate { .. }) => "Already exists",
            AppError::Repo(RepoError::Integrity { .. }) => "Conflicting state",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Repo(RepoError::Timeout) | AppError::Infra(InfraError::Database { .. }) => {
                "Service temporarily unavailable"
            }
            AppError::Repo(RepoError::Persistence(_))
            | AppError::Infra(_)
            | AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}
