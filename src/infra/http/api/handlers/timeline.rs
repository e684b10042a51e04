//! Timeline handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use crate::application::pagination::PageRequest;
use crate::domain::types::AccountId;

use super::{TimelineQuery, app_to_api};
use crate::infra::http::api::auth::RequestIdentity;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn home_timeline(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Query(query): Query<TimelineQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = PageRequest::from_wire(query.limit, query.cursor.as_deref());
    let page = state
        .timeline
        .home(identity.account(), request)
        .await
        .map_err(app_to_api)?;

    Ok(Json(page))
}

pub async fn author_timeline(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Path(author): Path<AccountId>,
    Query(query): Query<TimelineQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = PageRequest::from_wire(query.limit, query.cursor.as_deref());
    let page = state
        .timeline
        .author(identity.account(), author, request)
        .await
        .map_err(app_to_api)?;

    Ok(Json(page))
}
