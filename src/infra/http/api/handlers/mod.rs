//! API handlers organized by resource type.
//!
//! Each submodule contains handlers for a specific surface (timeline,
//! posts, engagement, follows, live socket, health). Error conversion
//! helpers shared across modules live here.

mod engagement;
mod health;
mod live;
mod posts;
mod social;
mod timeline;

pub use engagement::*;
pub use health::*;
pub use live::*;
pub use posts::*;
pub use social::*;
pub use timeline::*;

// ----- Shared query structs -----

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    pub user_id: i64,
}

// ----- Shared view building -----

use crate::domain::entities::{AccountRecord, PostRecord};
use stormo_api_types::{AccountView, PostView};

/// Project a freshly written post into its wire shape. The author just
/// created it, so the viewer-specific flags are necessarily false.
pub(crate) fn created_post_view(post: PostRecord, author: &AccountRecord) -> PostView {
    PostView {
        id: post.id,
        author: AccountView {
            id: author.id,
            handle: author.handle.clone(),
            display_name: author.display_name.clone(),
            avatar_url: author.avatar_url.clone(),
        },
        body: post.body,
        reply_to_id: post.reply_to_id,
        quote_of_id: post.quote_of_id,
        likes_count: post.likes_count,
        reposts_count: post.reposts_count,
        replies_count: post.replies_count,
        created_at: post.created_at,
        liked: false,
        reposted: false,
    }
}

// ----- Shared error conversions -----

use axum::http::StatusCode;

use crate::application::error::AppError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::Pagination(p) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_CURSOR,
            "Invalid cursor",
            Some(p.to_string()),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

pub(crate) fn app_to_api(err: AppError) -> ApiError {
    match err {
        AppError::Repo(repo) => repo_to_api(repo),
        AppError::Domain(DomainError::Validation { message }) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid request",
            Some(message),
        ),
        AppError::Domain(DomainError::NotFound { entity }) => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Resource not found",
            Some(entity.to_string()),
        ),
        AppError::NotFound => ApiError::not_found("resource not found"),
        AppError::Forbidden(message) => ApiError::forbidden(Some(message)),
        AppError::Infra(err) => ApiError::internal(Some(err.to_string())),
        AppError::Unexpected(message) => ApiError::internal(Some(message)),
    }
}
