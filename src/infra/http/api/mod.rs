pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/timeline/home", get(handlers::home_timeline))
        .route(
            "/api/v1/accounts/{id}/posts",
            get(handlers::author_timeline),
        )
        .route("/api/v1/posts", post(handlers::create_post))
        .route("/api/v1/posts/{id}", delete(handlers::delete_post))
        .route(
            "/api/v1/posts/{id}/like",
            post(handlers::like_post).delete(handlers::unlike_post),
        )
        .route(
            "/api/v1/posts/{id}/repost",
            post(handlers::repost_post).delete(handlers::unrepost_post),
        )
        .route(
            "/api/v1/accounts/{id}/follow",
            post(handlers::follow_account).delete(handlers::unfollow_account),
        )
        .route("/ws", get(handlers::live_socket))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
