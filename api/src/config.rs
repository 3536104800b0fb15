use std::time::Duration;

use stratagem_core::client::CompletionClient;
use stratagem_core::transport::HttpTransport;
use stratagem_core::types::RetryPolicy;

use crate::error::AppError;

const DEFAULT_ENDPOINT: &str = "https://api.mistral.ai/v1/chat/completions";
const DEFAULT_MODEL: &str = "mistral-small-latest";

/// Upstream model configuration, read once at startup.
///
/// The API key is optional at boot so the service can come up (and /health can
/// report the gap); generation routes fail the individual request with a 500
/// when the key is missing.
#[derive(Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub retry: RetryPolicy,
    /// Serve the canned demo document instead of failing when the upstream
    /// is unavailable or unparsable. Off by default.
    pub demo_fallback: bool,
}

impl LlmSettings {
    pub fn from_env() -> Self {
        let retry = RetryPolicy {
            max_attempts: env_parsed("LLM_MAX_ATTEMPTS").unwrap_or(3).max(1),
            base_delay: Duration::from_millis(env_parsed("LLM_RETRY_BASE_MS").unwrap_or(500)),
            backoff_multiplier: 2.0,
        };

        Self {
            endpoint: non_empty_env("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: non_empty_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: non_empty_env("LLM_API_KEY"),
            retry,
            demo_fallback: std::env::var("STRATAGEM_DEMO_FALLBACK")
                .map(|v| v == "true")
                .unwrap_or(false),
        }
    }

    /// Build a completion client for one request chain, or fail with the
    /// misconfiguration error when no API key is present.
    pub fn client(&self) -> Result<CompletionClient<HttpTransport>, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Internal("LLM_API_KEY must be configured".to_string()))?;
        Ok(CompletionClient::new(
            HttpTransport::new(&self.endpoint, api_key),
            self.retry,
        ))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}
