use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::UserId;
use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageBody {
  pub remaining: i64,
  pub limit: i64,
  pub reset_at: DateTime<Utc>,
}

/// GET /api/usage
///
/// Remaining daily allowance without consuming a unit.
pub async fn usage(
  State(state): State<AppState>,
  user: UserId,
) -> Result<Json<UsageBody>, ApiError> {
  let conn = db::try_lock(&state.db)?;
  let decision = db::usage::peek_usage(&conn, &user.0, state.config.daily_limit, Utc::now())?;
  Ok(Json(UsageBody {
    remaining: decision.remaining,
    limit: state.config.daily_limit,
    reset_at: decision.reset_at,
  }))
}

#[cfg(test)]
mod tests {
  use crate::config::Config;
  use crate::handlers::router;
  use crate::testing::{test_state, ScriptedProvider};
  use axum::http::{HeaderName, HeaderValue, StatusCode};
  use axum_test::TestServer;
  use serde_json::Value;
  use std::sync::Arc;

  #[tokio::test]
  async fn reports_full_allowance_for_a_fresh_user() {
    let (_tmp, state) = test_state(Arc::new(ScriptedProvider::new()), Config::default());
    let server = TestServer::new(router(state)).unwrap();

    let response = server
      .get("/api/usage")
      .add_header(
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_static("alice"),
      )
      .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["remaining"], 10);
    assert_eq!(body["limit"], 10);
    assert!(body["resetAt"].as_str().is_some());
  }

  #[tokio::test]
  async fn requires_identity() {
    let (_tmp, state) = test_state(Arc::new(ScriptedProvider::new()), Config::default());
    let server = TestServer::new(router(state)).unwrap();

    let response = server.get("/api/usage").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn health_needs_no_identity() {
    let (_tmp, state) = test_state(Arc::new(ScriptedProvider::new()), Config::default());
    let server = TestServer::new(router(state)).unwrap();

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "ok");
  }
}
