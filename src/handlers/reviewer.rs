use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::UserId;
use crate::db::{self, LogOnError};
use crate::error::ApiError;
use crate::extraction::input::{FileUpload, ValidationError};
use crate::extraction::{self, ExtractionRequest, ExtractionResult, Reviewer};
use crate::state::AppState;

/// POST /api/generate-reviewer
///
/// Multipart fields: `file` (optional), `textContent` (optional),
/// `extractionMode` (optional, defaults to full).
pub async fn generate_reviewer(
  State(state): State<AppState>,
  user: UserId,
  mut multipart: Multipart,
) -> Result<Json<ExtractionResult>, ApiError> {
  let request = read_extraction_request(&mut multipart).await?;
  let result = extraction::generate_reviewer(
    &state.db,
    state.provider.as_ref(),
    &state.config,
    &user.0,
    request,
  )
  .await?;

  // The extraction already succeeded; a persistence hiccup is logged but
  // does not fail the request.
  store_result(&state, &user.0, &result.reviewer);

  Ok(Json(result))
}

async fn read_extraction_request(multipart: &mut Multipart) -> Result<ExtractionRequest, ApiError> {
  let mut request = ExtractionRequest::default();
  loop {
    let field = match multipart.next_field().await {
      Ok(Some(field)) => field,
      Ok(None) => break,
      Err(e) => {
        tracing::debug!("multipart read failed: {}", e);
        return Err(ValidationError::MalformedBody.into());
      }
    };
    let name = field.name().unwrap_or_default().to_string();
    match name.as_str() {
      "file" => {
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = match field.bytes().await {
          Ok(bytes) => bytes.to_vec(),
          Err(e) => {
            tracing::debug!("failed to read uploaded file: {}", e);
            return Err(ValidationError::MalformedBody.into());
          }
        };
        request.file = Some(FileUpload { bytes, content_type, file_name });
      }
      "textContent" => {
        request.text = field.text().await.log_warn("failed to read textContent field");
      }
      "extractionMode" => {
        request.mode = field.text().await.log_warn("failed to read extractionMode field");
      }
      other => {
        tracing::debug!(field = %other, "ignoring unknown multipart field");
      }
    }
  }
  Ok(request)
}

fn store_result(state: &AppState, user_id: &str, reviewer: &Reviewer) {
  let Some(conn) = db::try_lock(&state.db).log_warn("skipping reviewer persistence") else {
    return;
  };
  let body = serde_json::to_string(reviewer).unwrap_or_else(|_| "{}".to_string());
  db::reviewers::insert_reviewer(
    &conn,
    user_id,
    &reviewer.title,
    &reviewer.extraction_mode,
    &body,
    Utc::now(),
  )
  .log_warn("failed to store reviewer");
}

/// GET /api/reviewers
pub async fn list_reviewers(
  State(state): State<AppState>,
  user: UserId,
) -> Result<Json<Vec<db::reviewers::ReviewerSummary>>, ApiError> {
  let conn = db::try_lock(&state.db)?;
  Ok(Json(db::reviewers::list_reviewers(&conn, &user.0)?))
}

/// Stored reviewer with its row metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerDetail {
  pub id: i64,
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub reviewer: Reviewer,
}

/// GET /api/reviewers/{id}
pub async fn get_reviewer(
  State(state): State<AppState>,
  user: UserId,
  Path(id): Path<i64>,
) -> Result<Json<ReviewerDetail>, ApiError> {
  let conn = db::try_lock(&state.db)?;
  let stored = db::reviewers::get_reviewer(&conn, &user.0, id)?.ok_or(ApiError::NotFound)?;
  let reviewer = serde_json::from_str(&stored.body)
    .log_warn("stored reviewer body unreadable")
    .unwrap_or_default();
  Ok(Json(ReviewerDetail {
    id: stored.id,
    created_at: stored.created_at,
    reviewer,
  }))
}

/// DELETE /api/reviewers/{id}
pub async fn delete_reviewer(
  State(state): State<AppState>,
  user: UserId,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  let conn = db::try_lock(&state.db)?;
  if db::reviewers::delete_reviewer(&conn, &user.0, id)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::handlers::router;
  use crate::provider::ProviderError;
  use crate::testing::{test_state, ScriptedProvider};
  use axum::http::{HeaderName, HeaderValue};
  use axum_test::multipart::{MultipartForm, Part};
  use axum_test::TestServer;
  use serde_json::Value;
  use std::sync::Arc;
  use tempfile::TempDir;

  const SENTENCE_RESPONSE: &str = r##"{"title":"Cell Biology","categories":[{"name":"Organelles","color":"#E0F2FE","terms":[{"term":"Mitochondria","definition":"The powerhouse of the cell.","examples":[],"keywords":[]}]}]}"##;

  fn server_with(provider: Arc<dyn crate::provider::GenerateReviewer>) -> (TempDir, TestServer) {
    let (temp, state) = test_state(provider, Config::default());
    (temp, TestServer::new(router(state)).unwrap())
  }

  fn as_user(request: axum_test::TestRequest, user: &'static str) -> axum_test::TestRequest {
    request.add_header(
      HeaderName::from_static("x-user-id"),
      HeaderValue::from_static(user),
    )
  }

  fn text_form(text: &str, mode: Option<&str>) -> MultipartForm {
    let mut form = MultipartForm::new().add_text("textContent", text);
    if let Some(mode) = mode {
      form = form.add_text("extractionMode", mode);
    }
    form
  }

  #[tokio::test]
  async fn sentence_mode_text_generates_a_reviewer() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(SENTENCE_RESPONSE)));

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form(
        "Mitochondria: the powerhouse of the cell.",
        Some("sentence"),
      ))
      .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["extractionMode"], "sentence");
    assert_eq!(body["remaining"], 9);
    let categories = body["categories"].as_array().unwrap();
    assert!(!categories.is_empty());
    let definition = categories[0]["terms"][0]["definition"].as_str().unwrap();
    assert_eq!(definition.matches('.').count(), 1, "one sentence expected");
  }

  #[tokio::test]
  async fn missing_input_is_a_400_without_categories() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(SENTENCE_RESPONSE)));

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(MultipartForm::new())
      .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().is_some());
    assert!(body.get("categories").is_none());
  }

  #[tokio::test]
  async fn unknown_mode_proceeds_as_full() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(SENTENCE_RESPONSE)));

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form("Some notes.", Some("spooky")))
      .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["extractionMode"], "full");
  }

  #[tokio::test]
  async fn oversized_text_is_rejected_with_the_limit_in_the_message() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(SENTENCE_RESPONSE)));

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form(&"a".repeat(100_001), None))
      .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("100000"));
  }

  #[tokio::test]
  async fn oversized_file_is_rejected_with_the_limit_in_the_message() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(SENTENCE_RESPONSE)));

    let part = Part::bytes(vec![0u8; 10 * 1024 * 1024 + 1])
      .file_name("notes.pdf")
      .mime_type("application/pdf");
    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(MultipartForm::new().add_part("file", part))
      .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("10 MiB"));
  }

  #[tokio::test]
  async fn unsupported_file_type_is_rejected() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(SENTENCE_RESPONSE)));

    let part = Part::bytes(b"PK\x03\x04".to_vec())
      .file_name("notes.zip")
      .mime_type("application/zip");
    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(MultipartForm::new().add_part("file", part))
      .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("PDF"));
  }

  #[tokio::test]
  async fn missing_identity_header_is_a_401() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(SENTENCE_RESPONSE)));

    let response = server
      .post("/api/generate-reviewer")
      .multipart(text_form("notes", None))
      .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn unconfigured_provider_is_a_500() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::unconfigured()));

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form("notes", None))
      .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("not configured"));
  }

  #[tokio::test]
  async fn malformed_model_output_is_recovered() {
    // Surrounding prose plus trailing commas still produce a reviewer.
    let raw = r##"Here you go: {"title":"T","categories":[{"name":"C","color":"#E0F2FE","terms":[{"term":"A","definition":"B",},]}]} Hope that helps!"##;
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(raw)));

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form("notes", None))
      .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["terms"][0]["term"], "A");
    assert_eq!(categories[0]["terms"][0]["definition"], "B");
  }

  #[tokio::test]
  async fn empty_model_output_is_a_500_and_still_consumes_quota() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always("")));

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form("notes", None))
      .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("empty response"));

    let usage = as_user(server.get("/api/usage"), "alice").await;
    usage.assert_status_ok();
    let usage_body: Value = usage.json();
    assert_eq!(usage_body["remaining"], 9);
  }

  #[tokio::test]
  async fn eleventh_request_of_the_day_is_a_429() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(SENTENCE_RESPONSE)));

    for _ in 0..10 {
      let response = as_user(server.post("/api/generate-reviewer"), "alice")
        .multipart(text_form("notes", None))
        .await;
      response.assert_status_ok();
    }

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form("notes", None))
      .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["remaining"], 0);
    assert!(body["resetAt"].as_str().unwrap().contains("T00:00:00"));
  }

  #[tokio::test]
  async fn provider_rate_limit_maps_to_429_and_timeout_to_504() {
    let provider = ScriptedProvider::always(SENTENCE_RESPONSE)
      .fail(ProviderError::RateLimited)
      .fail(ProviderError::Timeout);
    let (_tmp, server) = server_with(Arc::new(provider));

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form("notes", None))
      .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    let response = as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form("notes", None))
      .await;
    response.assert_status(StatusCode::GATEWAY_TIMEOUT);
  }

  #[tokio::test]
  async fn successful_generations_are_stored_and_manageable() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always(SENTENCE_RESPONSE)));

    as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form("notes", None))
      .await
      .assert_status_ok();

    let listed = as_user(server.get("/api/reviewers"), "alice").await;
    listed.assert_status_ok();
    let summaries: Value = listed.json();
    assert_eq!(summaries.as_array().unwrap().len(), 1);
    assert_eq!(summaries[0]["title"], "Cell Biology");
    let id = summaries[0]["id"].as_i64().unwrap();

    let detail = as_user(server.get(&format!("/api/reviewers/{id}")), "alice").await;
    detail.assert_status_ok();
    let detail_body: Value = detail.json();
    assert_eq!(detail_body["categories"].as_array().unwrap().len(), 1);

    // Another user cannot see or delete it.
    as_user(server.get(&format!("/api/reviewers/{id}")), "bob")
      .await
      .assert_status(StatusCode::NOT_FOUND);
    as_user(server.delete(&format!("/api/reviewers/{id}")), "bob")
      .await
      .assert_status(StatusCode::NOT_FOUND);

    as_user(server.delete(&format!("/api/reviewers/{id}")), "alice")
      .await
      .assert_status(StatusCode::NO_CONTENT);
    as_user(server.get(&format!("/api/reviewers/{id}")), "alice")
      .await
      .assert_status(StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn failed_generations_are_not_stored() {
    let (_tmp, server) = server_with(Arc::new(ScriptedProvider::always("")));

    as_user(server.post("/api/generate-reviewer"), "alice")
      .multipart(text_form("notes", None))
      .await
      .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let listed = as_user(server.get("/api/reviewers"), "alice").await;
    let summaries: Value = listed.json();
    assert!(summaries.as_array().unwrap().is_empty());
  }
}
