pub use reqwest::StatusCode as UpstreamStatusCode;
use reqwest::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

/// Diagnostic payload for a response that survived no amount of repair.
/// Carries bounded excerpts of the raw and cleaned text for server-side
/// logging; never returned verbatim to end users.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub reason: String,
    pub raw_excerpt: String,
    pub cleaned_excerpt: String,
}

/// Everything that can go wrong while obtaining a strategy document from the
/// upstream model.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// All attempts consumed; upstream is unavailable or persistently
    /// rate-limited. Carries the last observed status (None for transport
    /// failures) so callers can decide what to surface.
    #[error("upstream unavailable after {attempts} attempts: {detail}")]
    ExhaustedRetries {
        attempts: u32,
        last_status: Option<StatusCode>,
        detail: String,
    },
    /// Non-retryable HTTP failure (anything other than 429). Fails fast
    /// after a single attempt; retrying a 401 will not help.
    #[error("upstream returned {status}")]
    UpstreamStatus { status: StatusCode, detail: String },
    /// Upstream answered 2xx but the response carried no usable text.
    #[error("upstream response contained no content")]
    EmptyResponse,
    /// Cleanup heuristics were insufficient; the text is not a JSON object.
    /// Hard failure; the formatting defect is deterministic, not transient.
    #[error("upstream response could not be parsed: {}", .0.reason)]
    UnparsableResponse(ParseFailure),
}

impl CompletionError {
    /// True when retrying the same request could plausibly succeed.
    /// Only exhaustion qualifies; response-shape failures are deterministic.
    pub fn is_transient(&self) -> bool {
        matches!(self, CompletionError::ExhaustedRetries { .. })
    }
}

/// Structured error response returned by every API endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "upstream_unavailable")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const UPSTREAM_EMPTY_RESPONSE: &str = "upstream_empty_response";
    pub const UPSTREAM_UNPARSABLE: &str = "upstream_unparsable";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const RATE_LIMITED: &str = "rate_limited";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exhaustion_is_transient() {
        let exhausted = CompletionError::ExhaustedRetries {
            attempts: 3,
            last_status: Some(StatusCode::TOO_MANY_REQUESTS),
            detail: "rate limited".to_string(),
        };
        assert!(exhausted.is_transient());

        let rejected = CompletionError::UpstreamStatus {
            status: StatusCode::UNAUTHORIZED,
            detail: "bad key".to_string(),
        };
        assert!(!rejected.is_transient());
        assert!(!CompletionError::EmptyResponse.is_transient());
        assert!(
            !CompletionError::UnparsableResponse(ParseFailure {
                reason: "not json".to_string(),
                raw_excerpt: String::new(),
                cleaned_excerpt: String::new(),
            })
            .is_transient()
        );
    }
}
