//! Seam between the retry loop and the network. The client is generic over
//! [`CompletionTransport`] so the loop can be exercised against a scripted
//! transport in tests; [`HttpTransport`] is the production implementation.

use std::future::Future;

use reqwest::StatusCode;

use crate::types::CompletionRequest;

/// Outcome of one HTTP attempt that reached the upstream and came back with a
/// status line, successful or not.
#[derive(Debug)]
pub struct TransportReply {
    pub status: StatusCode,
    pub body: String,
}

/// The attempt never produced an HTTP response: connect failure, timeout,
/// broken body read.
#[derive(Debug, thiserror::Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

pub trait CompletionTransport: Send + Sync {
    fn send(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<TransportReply, TransportError>> + Send;
}

/// POSTs the request as a chat-completion body to the configured endpoint
/// with bearer auth.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

impl CompletionTransport for HttpTransport {
    async fn send(&self, request: &CompletionRequest) -> Result<TransportReply, TransportError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| TransportError(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError(format!("failed to read response body: {err}")))?;

        Ok(TransportReply { status, body })
    }
}
