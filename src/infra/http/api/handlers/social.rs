//! Follow-graph handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::types::AccountId;

use super::app_to_api;
use crate::infra::http::api::auth::RequestIdentity;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn follow_account(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Path(followee): Path<AccountId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .social
        .follow(identity.account(), followee)
        .await
        .map_err(app_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow_account(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Path(followee): Path<AccountId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .social
        .unfollow(identity.account(), followee)
        .await
        .map_err(app_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
