//! Caller identity.
//!
//! Authentication proper lives in front of this service; requests arrive
//! with an `X-User-Id` header naming the caller. This extractor only
//! resolves the stable key that the quota counter and reviewer ownership
//! are scoped by.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller identity (extracted per request)
#[derive(Debug, Clone)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(USER_ID_HEADER)
      .and_then(|value| value.to_str().ok())
      .map(str::trim)
      .filter(|value| !value.is_empty())
      .map(|value| UserId(value.to_string()))
      .ok_or(ApiError::Unauthorized)
  }
}
