//! The reviewer extraction pipeline.
//!
//! Strictly linear: quota gate, input normalization, prompt building,
//! generation, recovery parsing, assembly. Nothing is retried internally and
//! every failure surfaces to the handler as a typed [`ApiError`]. The quota
//! unit is charged up front and not refunded on downstream failure.

pub mod assemble;
pub mod input;
pub mod mode;
pub mod prompt;
pub mod recovery;

use chrono::Utc;

use crate::config::Config;
use crate::db::{self, DbPool};
use crate::error::ApiError;
use crate::provider::GenerateReviewer;

pub use assemble::{Category, ExtractionResult, Reviewer, Term};
pub use input::ExtractionRequest;
pub use mode::ExtractionMode;

/// Run the full pipeline for one request.
pub async fn generate_reviewer(
  pool: &DbPool,
  provider: &dyn GenerateReviewer,
  config: &Config,
  user_id: &str,
  request: ExtractionRequest,
) -> Result<ExtractionResult, ApiError> {
  // Fatal precondition, checked before the quota gate so an unconfigured
  // server never charges anyone.
  if !provider.is_configured() {
    return Err(ApiError::NoApiKeys);
  }

  let decision = {
    let conn = db::try_lock(pool)?;
    db::usage::check_and_reserve(&conn, user_id, config.daily_limit, Utc::now())?
  };
  if !decision.allowed {
    tracing::info!(user = %user_id, "daily generation limit reached");
    return Err(ApiError::QuotaExhausted { reset_at: decision.reset_at });
  }

  let input = input::validate(request, &config.limits())?;
  let mode = input.mode;

  let payload = prompt::build_payload(input);
  let raw = provider.generate(payload).await?;
  let parsed = recovery::parse(&raw.text)?;

  Ok(assemble::assemble(parsed, mode, decision.remaining))
}
