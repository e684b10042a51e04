//! Post publish and delete handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::posts::NewPost;
use crate::domain::types::PostId;
use stormo_api_types::CreatePostBody;

use super::{app_to_api, created_post_view};
use crate::infra::http::api::auth::RequestIdentity;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn create_post(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Json(payload): Json<CreatePostBody>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = NewPost {
        author_id: identity.account(),
        body: payload.body,
        reply_to_id: payload.reply_to_id,
        quote_of_id: payload.quote_of_id,
    };

    let published = state.publish.publish(draft).await.map_err(app_to_api)?;
    let view = created_post_view(published.post, &published.author);

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    identity: RequestIdentity,
    Path(post_id): Path<PostId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .publish
        .delete(identity.account(), post_id)
        .await
        .map_err(app_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
