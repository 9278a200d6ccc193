use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Header set by the authenticating proxy in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller. Handlers that take it reject anonymous requests
/// with 401 before the body is even read.
#[derive(Clone, Debug)]
pub struct CallerId(pub String);

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| CallerId(v.to_string()))
            .ok_or(AppError::Unauthenticated)
    }
}
