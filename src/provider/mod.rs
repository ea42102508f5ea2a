//! Generation provider abstraction.
//!
//! The pipeline only needs "give me model text for this payload" and "tell me
//! whether any credentials are configured", so the provider sits behind a
//! trait and handlers (and tests) inject whichever implementation they want.

pub mod gemini;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use crate::extraction::prompt::ModelPayload;

pub use gemini::GeminiClient;

/// Raw model output, opaque until the recovery parser runs.
#[derive(Debug, Clone)]
pub struct RawModelResponse {
    pub text: String,
}

/// Typed provider failures. The HTTP layer dispatches on these variants
/// instead of matching substrings of provider error messages.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no provider API keys configured")]
    NoKeys,
    #[error("provider rate limit hit")]
    RateLimited,
    #[error("provider request timed out")]
    Timeout,
    #[error("uploaded file failed provider-side processing")]
    FileProcessing,
    #[error("provider returned status {status}")]
    Api { status: u16, body: String },
    #[error("provider transport error: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait GenerateReviewer: Send + Sync {
    /// Whether at least one credential is configured. Checked before the
    /// quota gate so an unconfigured server never charges quota.
    fn is_configured(&self) -> bool;

    /// Submit one generation request. May block on file upload and
    /// readiness polling; never retries on its own.
    async fn generate(&self, payload: ModelPayload) -> Result<RawModelResponse, ProviderError>;
}

/// Round-robin ring of provider API keys.
///
/// Spreads per-key rate-limit pressure across every configured credential.
/// The selection policy lives here so a different one (failover,
/// health-based) can be swapped in without touching the client.
#[derive(Debug)]
pub struct KeyRing {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Next key in rotation, or `None` when no keys are configured.
    pub fn next_key(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.keys.get(i % self.keys.len()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_yields_no_key() {
        let ring = KeyRing::new(vec![]);
        assert!(ring.is_empty());
        assert_eq!(ring.next_key(), None);
    }

    #[test]
    fn single_key_repeats() {
        let ring = KeyRing::new(vec!["k1".to_string()]);
        assert_eq!(ring.next_key(), Some("k1"));
        assert_eq!(ring.next_key(), Some("k1"));
    }

    #[test]
    fn keys_rotate_round_robin() {
        let ring = KeyRing::new(vec!["k1".to_string(), "k2".to_string(), "k3".to_string()]);
        assert_eq!(ring.next_key(), Some("k1"));
        assert_eq!(ring.next_key(), Some("k2"));
        assert_eq!(ring.next_key(), Some("k3"));
        assert_eq!(ring.next_key(), Some("k1"));
    }
}
