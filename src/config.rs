use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::rate_limit::RateLimitConfig;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_TIMEOUT_MS: u64 = 30_000;
// Worst case for a valid chat body is 9000 characters escaped as UTF-16
// surrogate pairs (`\ud83d\ude00`, 12 bytes each), about 108 KB.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 256 * 1024;

/// Settings for the Gemini client. The API key is held here only; it is
/// never logged.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub extension_api_key: String,
    pub port: u16,
    pub rate_limit: RateLimitConfig,
    pub max_request_bytes: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("gemini", &self.gemini)
            .field("extension_api_key", &"<redacted>")
            .field("port", &self.port)
            .field("rate_limit", &self.rate_limit)
            .field("max_request_bytes", &self.max_request_bytes)
            .finish()
    }
}

impl AppConfig {
    /// Loads a `.env` file from the working directory or one of its parents
    /// when present, then reads the environment. Variables already set in the
    /// process environment take precedence over the file.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(anyhow!(err).context("failed to read .env file")),
        }
        Self::from_env()
    }

    /// Same as [`AppConfig::load`] with an explicit env file, which must exist.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        dotenvy::from_path(path)
            .with_context(|| format!("failed to read env file '{}'", path.display()))?;
        Self::from_env()
    }

    /// Reads the process configuration. Both secrets are mandatory: the
    /// service must not come up without them.
    pub fn from_env() -> Result<Self> {
        let api_key = required_var("GEMINI_API_KEY")?;
        let extension_api_key = required_var("EXTENSION_API_KEY")?;

        let port = match parse_optional_u64("PORT")? {
            Some(p) => u16::try_from(p).map_err(|_| anyhow!("PORT must be at most 65535"))?,
            None => DEFAULT_PORT,
        };

        let model = optional_var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = optional_var("GEMINI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout_ms = parse_optional_u64("GEMINI_TIMEOUT_MS")?.unwrap_or(DEFAULT_GEMINI_TIMEOUT_MS);

        let defaults = RateLimitConfig::default();
        let max_requests = parse_optional_u64("RATE_LIMIT_REQUESTS")?
            .map(|v| v as usize)
            .unwrap_or(defaults.max_requests);
        let window_secs = parse_optional_u64("RATE_LIMIT_WINDOW_SECS")?
            .unwrap_or(defaults.window.as_secs());
        if max_requests == 0 {
            bail!("RATE_LIMIT_REQUESTS must be greater than zero");
        }
        if window_secs == 0 {
            bail!("RATE_LIMIT_WINDOW_SECS must be greater than zero");
        }

        let max_request_bytes = parse_optional_u64("MAX_REQUEST_BYTES")?
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_REQUEST_BYTES);

        Ok(Self {
            gemini: GeminiConfig {
                api_key,
                model,
                base_url,
                timeout: Duration::from_millis(timeout_ms),
            },
            extension_api_key,
            port,
            rate_limit: RateLimitConfig {
                max_requests,
                window: Duration::from_secs(window_secs),
            },
            max_request_bytes,
        })
    }
}

/// Secrets are taken verbatim; the authorizer compares them byte for byte.
fn required_var(var: &str) -> Result<String> {
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{} not found in environment", var))
}

fn optional_var(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
