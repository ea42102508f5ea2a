//! Gemini REST client.
//!
//! Talks to the generative-language API: raw file upload, file-state polling
//! until the provider has ingested the upload, and a single generateContent
//! call with a forced JSON response mime type.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;

use crate::config::{Config, FILE_POLL_INTERVAL_MILLIS, GEMINI_BASE_URL};
use crate::extraction::input::SourceMaterial;
use crate::extraction::prompt::ModelPayload;

use super::{GenerateReviewer, KeyRing, ProviderError, RawModelResponse};

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    keys: KeyRing,
    poll_interval: Duration,
    poll_deadline: Duration,
}

/// Provider-side file record, returned by upload and by the status endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    uri: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    mime_type: Option<String>,
}

impl GeminiFile {
    fn is_processing(&self) -> bool {
        self.state == "PROCESSING"
    }

    fn is_failed(&self) -> bool {
        self.state == "FAILED"
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self::with_endpoint(
            GEMINI_BASE_URL.to_string(),
            config.api_keys.clone(),
            config.model.clone(),
            Duration::from_millis(FILE_POLL_INTERVAL_MILLIS),
            Duration::from_secs(config.file_poll_deadline_secs),
        )
    }

    /// Construct against an arbitrary endpoint. Production uses
    /// [`GeminiClient::new`]; this exists for pointing at test servers.
    pub fn with_endpoint(
        base_url: String,
        keys: Vec<String>,
        model: String,
        poll_interval: Duration,
        poll_deadline: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to construct HTTP client");
        Self {
            http,
            base_url,
            model,
            keys: KeyRing::new(keys),
            poll_interval,
            poll_deadline,
        }
    }

    async fn upload_file(
        &self,
        key: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<GeminiFile, ProviderError> {
        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, key);
        let resp = self
            .http
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await
            .map_err(map_transport)?;
        let resp = check_status(resp).await?;
        let body: UploadResponse = resp.json().await.map_err(map_transport)?;
        tracing::debug!(file = %body.file.name, state = %body.file.state, "uploaded file");
        Ok(body.file)
    }

    async fn get_file(&self, key: &str, name: &str) -> Result<GeminiFile, ProviderError> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, key);
        let resp = self.http.get(&url).send().await.map_err(map_transport)?;
        let resp = check_status(resp).await?;
        resp.json().await.map_err(map_transport)
    }

    /// Poll until the uploaded file leaves PROCESSING, bounded by the
    /// configured deadline. FAILED is terminal for this request.
    async fn wait_for_file(&self, key: &str, mut file: GeminiFile) -> Result<GeminiFile, ProviderError> {
        let started = Instant::now();
        while file.is_processing() {
            if started.elapsed() >= self.poll_deadline {
                tracing::warn!(file = %file.name, "file readiness poll exceeded deadline");
                return Err(ProviderError::Timeout);
            }
            tokio::time::sleep(self.poll_interval).await;
            file = self.get_file(key, &file.name).await?;
        }
        if file.is_failed() {
            tracing::warn!(file = %file.name, "provider failed to process uploaded file");
            return Err(ProviderError::FileProcessing);
        }
        Ok(file)
    }

    async fn generate_content(
        &self,
        key: &str,
        system_instruction: &str,
        parts: Vec<serde_json::Value>,
        payload: &ModelPayload,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, key
        );
        let body = json!({
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": payload.params.temperature,
                "maxOutputTokens": payload.params.max_output_tokens,
                "responseMimeType": payload.params.response_mime_type,
            }
        });

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;
        let resp = check_status(resp).await?;
        let body: GenerateResponse = resp.json().await.map_err(map_transport)?;

        let text = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }
}

#[async_trait]
impl GenerateReviewer for GeminiClient {
    fn is_configured(&self) -> bool {
        !self.keys.is_empty()
    }

    async fn generate(&self, payload: ModelPayload) -> Result<RawModelResponse, ProviderError> {
        let key = self.keys.next_key().ok_or(ProviderError::NoKeys)?.to_string();

        let mut parts = vec![json!({ "text": payload.user_instruction })];
        match &payload.source {
            SourceMaterial::File { bytes, mime } => {
                let uploaded = self.upload_file(&key, bytes.clone(), mime).await?;
                let ready = self.wait_for_file(&key, uploaded).await?;
                let mime = ready.mime_type.as_deref().unwrap_or(*mime);
                parts.push(json!({ "fileData": { "fileUri": ready.uri, "mimeType": mime } }));
            }
            SourceMaterial::Text(text) => {
                parts.push(json!({ "text": text }));
            }
        }

        let text = self
            .generate_content(&key, &payload.system_instruction, parts, &payload)
            .await?;
        Ok(RawModelResponse { text })
    }
}

fn map_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http(err)
    }
}

/// Translate non-success statuses into typed errors. The response body is
/// kept for server-side logs only.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), body = %body, "provider call failed");
    match status.as_u16() {
        429 => Err(ProviderError::RateLimited),
        408 | 504 => Err(ProviderError::Timeout),
        s => Err(ProviderError::Api { status: s, body }),
    }
}
