use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::types::AccountId;

use super::error::ApiError;

pub const IDENTITY_HEADER: &str = "x-user-id";

/// Identity of the calling account, read from the `X-User-Id` header.
///
/// No credential check happens here; the deployment is expected to sit
/// behind an authenticating proxy that owns the header.
#[derive(Debug, Clone, Copy)]
pub struct RequestIdentity(AccountId);

impl RequestIdentity {
    pub fn account(&self) -> AccountId {
        self.0
    }
}

impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<AccountId>().ok())
            .map(Self)
            .ok_or_else(ApiError::unauthorized)
    }
}
