//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;
use crate::provider::GenerateReviewer;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Quota counters and stored reviewers
    pub db: DbPool,

    /// Generation provider (injectable; tests use a scripted fake)
    pub provider: Arc<dyn GenerateReviewer>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DbPool, provider: Arc<dyn GenerateReviewer>, config: Arc<Config>) -> Self {
        Self { db, provider, config }
    }
}
