//! Request-level error taxonomy and HTTP mapping.
//!
//! Every failure a handler can produce flows through [`ApiError`]. Raw
//! provider or database detail is logged here and never reaches the client;
//! response bodies carry a sanitized `{ "error": ... }` only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::db::DbLockError;
use crate::extraction::input::ValidationError;
use crate::extraction::recovery::ParseError;
use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("missing user identity")]
  Unauthorized,
  #[error("daily generation limit reached")]
  QuotaExhausted { reset_at: DateTime<Utc> },
  #[error("no provider API keys configured")]
  NoApiKeys,
  #[error(transparent)]
  Provider(#[from] ProviderError),
  #[error(transparent)]
  Parse(#[from] ParseError),
  #[error("database error")]
  Db(#[from] rusqlite::Error),
  #[error("database unavailable")]
  DbLock(#[from] DbLockError),
  #[error("reviewer not found")]
  NotFound,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    // Quota denial carries extra fields so the client can show the reset time.
    if let ApiError::QuotaExhausted { reset_at } = &self {
      let body = json!({
        "error": "daily generation limit reached, try again tomorrow",
        "remaining": 0,
        "resetAt": reset_at.to_rfc3339(),
      });
      return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }

    let (status, message) = match &self {
      ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "missing user identity".to_string()),
      ApiError::QuotaExhausted { .. } => unreachable!("handled above"),
      ApiError::NoApiKeys => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "reviewer generation is not configured on this server".to_string(),
      ),
      ApiError::Provider(ProviderError::RateLimited) => (
        StatusCode::TOO_MANY_REQUESTS,
        "the AI service is busy right now, please try again shortly".to_string(),
      ),
      ApiError::Provider(ProviderError::Timeout) => (
        StatusCode::GATEWAY_TIMEOUT,
        "the request timed out, please try again".to_string(),
      ),
      ApiError::Provider(ProviderError::FileProcessing) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "the uploaded file could not be processed, please try a different file".to_string(),
      ),
      ApiError::Provider(_) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "reviewer generation failed, please try again".to_string(),
      ),
      ApiError::Parse(ParseError::EmptyResponse) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "the AI returned an empty response, please try again".to_string(),
      ),
      ApiError::Parse(_) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "the AI response could not be read, please try again".to_string(),
      ),
      ApiError::Db(_) | ApiError::DbLock(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
      }
      ApiError::NotFound => (StatusCode::NOT_FOUND, "reviewer not found".to_string()),
    };

    if status.is_server_error() {
      tracing::error!(error = ?self, status = status.as_u16(), "request failed");
    } else {
      tracing::debug!(error = ?self, status = status.as_u16(), "request rejected");
    }

    (status, Json(json!({ "error": message }))).into_response()
  }
}
