//! The resilient completion client: one retry loop around the upstream
//! chat-completion endpoint, followed by tolerant extraction of the JSON
//! document the caller actually wants.
//!
//! Retry rules are deliberately narrow. HTTP 429 and transport failures are
//! the only transient conditions; every other non-success status fails fast
//! after a single attempt, and a 2xx response with broken content is never
//! retried: whatever formatting defect the model produced is deterministic
//! to within randomness already spent.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::CompletionError;
use crate::repair;
use crate::transport::CompletionTransport;
use crate::types::{CompletionRequest, RetryPolicy, StrategyDocument};

/// Upstream response envelope: a list of choices, each carrying a message
/// whose content is the raw model text.
#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<EnvelopeChoice>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeChoice {
    #[serde(default)]
    message: EnvelopeMessage,
}

#[derive(Debug, Default, Deserialize)]
struct EnvelopeMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct CompletionClient<T: CompletionTransport> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: CompletionTransport> CompletionClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Obtain a parsed strategy document for the request, absorbing transient
    /// upstream failures and tolerating non-strict JSON formatting. Never
    /// returns a partially-parsed document.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<StrategyDocument, CompletionError> {
        let content = self.execute(request).await?;
        repair::parse_document(&content).map_err(|failure| {
            tracing::error!(
                reason = %failure.reason,
                raw = %failure.raw_excerpt,
                cleaned = %failure.cleaned_excerpt,
                "upstream response survived no repair pass"
            );
            CompletionError::UnparsableResponse(failure)
        })
    }

    /// Same retry loop, raw text result. Used where the model is asked for
    /// prose rather than JSON (node refinement chat).
    pub async fn complete_text(
        &self,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError> {
        self.execute(request).await
    }

    /// The attempt loop. Sleeps are awaited tokio timers, so a backing-off
    /// call chain suspends only itself, never the runtime.
    async fn execute(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let attempts = self.policy.attempts();
        let mut last_status: Option<StatusCode> = None;
        let mut last_detail = String::new();

        for attempt in 0..attempts {
            match self.transport.send(request).await {
                Ok(reply) if reply.status.is_success() => {
                    return extract_content(&reply.body);
                }
                Ok(reply) if reply.status == StatusCode::TOO_MANY_REQUESTS => {
                    last_status = Some(reply.status);
                    last_detail = trim_detail(&reply.body);
                    if attempt + 1 < attempts {
                        let delay = self.policy.delay_for(attempt);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts = attempts,
                            delay_ms = delay.as_millis() as u64,
                            "upstream rate limited, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Ok(reply) => {
                    tracing::warn!(
                        status = %reply.status,
                        detail = %trim_detail(&reply.body),
                        "upstream returned non-retryable status"
                    );
                    return Err(CompletionError::UpstreamStatus {
                        status: reply.status,
                        detail: trim_detail(&reply.body),
                    });
                }
                Err(err) => {
                    last_status = None;
                    last_detail = err.to_string();
                    if attempt + 1 < attempts {
                        let delay = self.policy.delay_for(attempt);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts = attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "transport failure, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::error!(
            attempts,
            last_status = ?last_status,
            detail = %last_detail,
            "retries exhausted"
        );
        Err(CompletionError::ExhaustedRetries {
            attempts,
            last_status,
            detail: last_detail,
        })
    }
}

/// Pull the model text out of the response envelope.
fn extract_content(body: &str) -> Result<String, CompletionError> {
    let envelope: CompletionEnvelope = serde_json::from_str(body).map_err(|err| {
        tracing::warn!(error = %err, "upstream 2xx body was not a completion envelope");
        CompletionError::EmptyResponse
    })?;

    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(CompletionError::EmptyResponse)
}

fn trim_detail(body: &str) -> String {
    const MAX: usize = 300;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        trimmed.chars().take(MAX).collect()
    }
}
