pub mod reviewer;
pub mod usage;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub use reviewer::{delete_reviewer, generate_reviewer, get_reviewer, list_reviewers};
pub use usage::usage;

/// Liveness probe
pub async fn health() -> &'static str {
  "ok"
}

/// Assemble the application router.
///
/// The transport body limit sits a little above the upload ceiling so
/// slightly-oversized files reach the normalizer and get its specific 400
/// instead of a bare 413.
pub fn router(state: AppState) -> Router {
  let body_limit = state.config.max_upload_bytes + 1024 * 1024;

  Router::new()
    .route("/health", get(health))
    .route("/api/generate-reviewer", post(generate_reviewer))
    .route("/api/reviewers", get(list_reviewers))
    .route("/api/reviewers/{id}", get(get_reviewer).delete(delete_reviewer))
    .route("/api/usage", get(usage))
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(state)
}
