//! Test utilities.
//!
//! Provides a tempfile-backed database initialized through the authoritative
//! migrations, plus a scripted provider so pipeline and endpoint tests run
//! without touching the real generation API.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{self, DbPool};
use crate::extraction::prompt::ModelPayload;
use crate::provider::{GenerateReviewer, ProviderError, RawModelResponse};
use crate::state::AppState;

/// Test environment with a scratch database using the authoritative schema.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let conn = Connection::open(temp.path().join("reviewgen.db"))?;
        db::schema::run_migrations(&conn)?;
        Ok(Self { temp, conn })
    }
}

/// Pooled variant for code that takes a [`DbPool`]. The TempDir must stay
/// alive for the duration of the test.
pub fn test_pool() -> (TempDir, DbPool) {
    let temp = TempDir::new().expect("failed to create temp dir");
    let pool = db::init_db(&temp.path().join("reviewgen.db")).expect("failed to init test db");
    (temp, pool)
}

/// Full application state around a scripted provider.
pub fn test_state(provider: Arc<dyn GenerateReviewer>, config: Config) -> (TempDir, AppState) {
    let (temp, pool) = test_pool();
    let state = AppState::new(pool, provider, Arc::new(config));
    (temp, state)
}

/// Provider fake that replays scripted outcomes.
///
/// Scripted responses are consumed in order; once the queue is empty the
/// default response (or empty text) is returned. Never performs I/O.
pub struct ScriptedProvider {
    configured: bool,
    default_response: Option<String>,
    queue: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            configured: true,
            default_response: None,
            queue: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider with no credentials configured.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Replies with the same text on every call.
    pub fn always(text: &str) -> Self {
        Self {
            default_response: Some(text.to_string()),
            ..Self::new()
        }
    }

    /// Queue one successful response.
    pub fn respond(self, text: &str) -> Self {
        self.queue.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    /// Queue one failure.
    pub fn fail(self, err: ProviderError) -> Self {
        self.queue.lock().unwrap().push_back(Err(err));
        self
    }

    /// Number of generate calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerateReviewer for ScriptedProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, _payload: ModelPayload) -> Result<RawModelResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.queue.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(RawModelResponse { text }),
            Some(Err(err)) => Err(err),
            None => Ok(RawModelResponse {
                text: self.default_response.clone().unwrap_or_default(),
            }),
        }
    }
}
