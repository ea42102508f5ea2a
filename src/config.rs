//! Application configuration.
//!
//! Values load with priority: config.toml > environment (.env is read first)
//! > built-in default. Tunables that never vary per deployment stay as plain
//! constants.

use serde::Deserialize;
use std::path::PathBuf;

// ==================== Provider Configuration ====================

/// Generative-language API endpoint
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for reviewer extraction
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Fixed cadence of the file-readiness poll
pub const FILE_POLL_INTERVAL_MILLIS: u64 = 1000;

/// Default ceiling on the file-readiness poll before the request times out
pub const DEFAULT_FILE_POLL_DEADLINE_SECS: u64 = 60;

// ==================== Usage Limits ====================

/// Generations allowed per user per UTC day
pub const DEFAULT_DAILY_LIMIT: i64 = 10;

/// Upload size ceiling
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Pasted-text length ceiling
pub const DEFAULT_MAX_TEXT_CHARS: usize = 100_000;

// ==================== Server Configuration ====================

/// Default bind address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Default database location
pub const DEFAULT_DB_PATH: &str = "data/reviewgen.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_keys: Vec<String>,
    pub model: String,
    pub daily_limit: i64,
    pub max_upload_bytes: usize,
    pub max_text_chars: usize,
    pub file_poll_deadline_secs: u64,
    pub bind_addr: String,
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            daily_limit: DEFAULT_DAILY_LIMIT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            file_poll_deadline_secs: DEFAULT_FILE_POLL_DEADLINE_SECS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    provider: Option<ProviderSection>,
    limits: Option<LimitsSection>,
    server: Option<ServerSection>,
    database: Option<DatabaseSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderSection {
    api_keys: Option<Vec<String>>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitsSection {
    daily_limit: Option<i64>,
    max_upload_mib: Option<usize>,
    max_text_chars: Option<usize>,
    file_poll_deadline_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    bind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

impl Config {
    /// Load configuration with priority: config.toml > env > default.
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file = read_config_file();
        let provider = file.provider.unwrap_or_default();
        let limits = file.limits.unwrap_or_default();
        let server = file.server.unwrap_or_default();
        let database = file.database.unwrap_or_default();

        let api_keys = provider
            .api_keys
            .filter(|keys| !keys.is_empty())
            .map(|keys| {
                tracing::info!("Using {} API key(s) from config.toml", keys.len());
                keys
            })
            .or_else(keys_from_env)
            .unwrap_or_default();
        if api_keys.is_empty() {
            tracing::warn!("No provider API keys configured; generation requests will fail");
        }

        let model = provider
            .model
            .or_else(|| std::env::var("GEMINI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let bind_addr = server
            .bind
            .or_else(|| std::env::var("BIND_ADDR").ok())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let database_path = database
            .path
            .or_else(|| std::env::var("DATABASE_PATH").ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        tracing::info!("Using database path: {}", database_path.display());

        Self {
            api_keys,
            model,
            daily_limit: limits.daily_limit.unwrap_or(DEFAULT_DAILY_LIMIT),
            max_upload_bytes: limits
                .max_upload_mib
                .map(|mib| mib * 1024 * 1024)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_text_chars: limits.max_text_chars.unwrap_or(DEFAULT_MAX_TEXT_CHARS),
            file_poll_deadline_secs: limits
                .file_poll_deadline_secs
                .unwrap_or(DEFAULT_FILE_POLL_DEADLINE_SECS),
            bind_addr,
            database_path,
        }
    }

    /// Size ceilings for the input normalizer.
    pub fn limits(&self) -> crate::extraction::input::Limits {
        crate::extraction::input::Limits {
            max_upload_bytes: self.max_upload_bytes,
            max_text_chars: self.max_text_chars,
        }
    }
}

fn read_config_file() -> FileConfig {
    let Ok(contents) = std::fs::read_to_string("config.toml") else {
        return FileConfig::default();
    };
    match toml::from_str::<FileConfig>(&contents) {
        Ok(config) => {
            tracing::info!("Loaded config.toml");
            config
        }
        Err(e) => {
            tracing::warn!("Ignoring malformed config.toml: {}", e);
            FileConfig::default()
        }
    }
}

fn keys_from_env() -> Option<Vec<String>> {
    let raw = std::env::var("GEMINI_API_KEYS").ok()?;
    let keys: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    if keys.is_empty() {
        return None;
    }
    tracing::info!("Using {} API key(s) from GEMINI_API_KEYS env", keys.len());
    Some(keys)
}
