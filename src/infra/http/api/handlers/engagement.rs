//! Like and repost handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::types::PostId;

use super::app_to_api;
use crate::infra::http::api::auth::RequestIdentity;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn like_post(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Path(post_id): Path<PostId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .social
        .like(identity.account(), post_id)
        .await
        .map_err(app_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlike_post(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Path(post_id): Path<PostId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .social
        .unlike(identity.account(), post_id)
        .await
        .map_err(app_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn repost_post(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Path(post_id): Path<PostId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .social
        .repost(identity.account(), post_id)
        .await
        .map_err(app_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unrepost_post(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Path(post_id): Path<PostId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .social
        .unrepost(identity.account(), post_id)
        .await
        .map_err(app_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
