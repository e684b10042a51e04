//! Liveness and readiness probes

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::infra::http::api::state::ApiState;

pub async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Ready only when the database answers; the caches and relay have no
/// failure mode that should take the instance out of rotation.
pub async fn readyz(State(state): State<ApiState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::readyz",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
