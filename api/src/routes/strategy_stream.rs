//! Progressive strategy generation over SSE.
//!
//! One summary call first (its `projectName` seeds the category prompts),
//! then six category completions fanned out as independent tasks. Every
//! branch owns its own client call, retry loop and failure domain: a failing
//! category emits a per-category error event and leaves its siblings alone.
//! Events reach the stream in completion order; a terminal `complete` event
//! is emitted once every branch has reported.
//!
//! If the consumer disconnects the receiver drops, every branch observes the
//! closed channel and stops, and the driver task winds down. No orphaned
//! retry loops keep burning backoff delays for a listener that is gone.

use std::convert::Infallible;

use axum::Router;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use serde::Serialize;
use stratagem_core::client::CompletionClient;
use stratagem_core::error::CompletionError;
use stratagem_core::transport::CompletionTransport;
use stratagem_core::types::CompletionRequest;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::prompts::{self, Category};
use crate::routes::strategy::{GenerateStrategyRequest, validate_idea};
use crate::state::AppState;

const CATEGORY_MAX_TOKENS: u32 = 8000;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/strategy/stream", post(stream_strategy))
}

/// Tagged events emitted on the stream, one JSON object per SSE message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// First event: project name + tagline
    Summary { data: serde_json::Value },
    /// One per category, in completion order
    Category {
        category: &'static str,
        data: serde_json::Value,
    },
    /// Per-branch failure; siblings are unaffected
    Error {
        category: &'static str,
        error: String,
    },
    /// Terminal marker: every branch has reported
    Complete,
}

#[utoipa::path(
    post,
    path = "/v1/strategy/stream",
    request_body = GenerateStrategyRequest,
    responses(
        (status = 200, description = "SSE stream of tagged generation events (summary, category, error, complete)"),
        (status = 400, description = "Missing or malformed idea", body = stratagem_core::error::ApiError),
        (status = 500, description = "Upstream misconfigured", body = stratagem_core::error::ApiError)
    ),
    tag = "strategy"
)]
pub async fn stream_strategy(
    State(state): State<AppState>,
    AppJson(req): AppJson<GenerateStrategyRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, AppError> {
    validate_idea(&req.idea)?;
    let client = state.llm.client()?;
    let idea = req.idea.trim().to_string();

    let (tx, rx) = mpsc::channel::<StreamEvent>(16);
    tokio::spawn(run_generation(client, state.llm.model.clone(), idea, tx));

    let stream = ReceiverStream::new(rx).map(|event| Ok(to_sse_event(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &StreamEvent) -> Event {
    // StreamEvent serialization cannot fail; the fallback keeps the stream alive anyway
    Event::default().data(serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string()))
}

/// Drives one generation: summary, then the category fan-out.
pub(crate) async fn run_generation<T>(
    client: CompletionClient<T>,
    model: String,
    idea: String,
    tx: mpsc::Sender<StreamEvent>,
) where
    T: CompletionTransport + Clone + Send + Sync + 'static,
{
    let summary_request = CompletionRequest::from_prompt(&model, prompts::summary_prompt(&idea));
    let summary = tokio::select! {
        biased;
        _ = tx.closed() => return,
        result = client.complete(&summary_request) => result,
    };

    let project_name = match summary {
        Ok(doc) => {
            let name = doc
                .get("projectName")
                .and_then(|value| value.as_str())
                .unwrap_or("Untitled project")
                .to_string();
            if tx
                .send(StreamEvent::Summary {
                    data: doc.into_value(),
                })
                .await
                .is_err()
            {
                return;
            }
            name
        }
        Err(err) => {
            // Without a summary there is no project name to seed the
            // categories with; end the stream instead of fanning out.
            tracing::error!(error = %err, "summary generation failed, ending stream");
            let _ = tx
                .send(StreamEvent::Error {
                    category: "summary",
                    error: user_message(&err),
                })
                .await;
            let _ = tx.send(StreamEvent::Complete).await;
            return;
        }
    };

    let mut branches = JoinSet::new();
    for category in Category::ALL {
        let client = client.clone();
        let tx = tx.clone();
        let request = CompletionRequest::from_prompt(&model, category.prompt(&idea, &project_name))
            .with_max_tokens(CATEGORY_MAX_TOKENS);

        branches.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = tx.closed() => return,
                result = client.complete(&request) => result,
            };
            match result {
                Ok(doc) => {
                    let _ = tx
                        .send(StreamEvent::Category {
                            category: category.name(),
                            data: doc.into_value(),
                        })
                        .await;
                }
                Err(err) => {
                    tracing::warn!(
                        category = category.name(),
                        error = %err,
                        "category generation failed"
                    );
                    let _ = tx
                        .send(StreamEvent::Error {
                            category: category.name(),
                            error: user_message(&err),
                        })
                        .await;
                }
            }
        });
    }

    // Join every branch regardless of individual outcomes (a panicked branch
    // surfaces as a JoinError and must not cancel its siblings).
    while branches.join_next().await.is_some() {}
    let _ = tx.send(StreamEvent::Complete).await;
}

/// User-facing failure text. Diagnostic excerpts stay in the server logs.
fn user_message(err: &CompletionError) -> String {
    match err {
        CompletionError::ExhaustedRetries { .. } => {
            "The language model is overloaded; this section could not be generated.".to_string()
        }
        CompletionError::UpstreamStatus { status, .. } => {
            format!("The language model rejected the request ({status}).")
        }
        CompletionError::EmptyResponse => {
            "The language model returned no usable content.".to_string()
        }
        CompletionError::UnparsableResponse(_) => {
            "The language model response could not be interpreted.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use stratagem_core::error::UpstreamStatusCode;
    use stratagem_core::transport::{TransportError, TransportReply};
    use stratagem_core::types::RetryPolicy;

    use super::*;

    fn envelope(content: &str) -> String {
        serde_json::json!({
            "choices": [{ "message": { "content": content } }]
        })
        .to_string()
    }

    /// Routes replies by prompt content: the summary succeeds, one chosen
    /// category fails, everything else returns a small valid document.
    #[derive(Clone)]
    struct RoutedTransport {
        failing_section: Option<&'static str>,
        calls: Arc<AtomicU32>,
    }

    impl RoutedTransport {
        fn new(failing_section: Option<&'static str>) -> Self {
            Self {
                failing_section,
                calls: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl CompletionTransport for RoutedTransport {
        async fn send(
            &self,
            request: &CompletionRequest,
        ) -> Result<TransportReply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let prompt = &request.messages[0].content;
            if let Some(section) = self.failing_section {
                if prompt.contains(&format!("the {section} section")) {
                    return Ok(TransportReply {
                        status: UpstreamStatusCode::INTERNAL_SERVER_ERROR,
                        body: "upstream broke".to_string(),
                    });
                }
            }
            let content = if prompt.contains("project summary") {
                r#"{"projectName":"Verdant","tagline":"plant care on autopilot"}"#
            } else {
                r#"{"generated":true}"#
            };
            Ok(TransportReply {
                status: UpstreamStatusCode::OK,
                body: envelope(content),
            })
        }
    }

    /// Summary call always fails with a non-retryable status.
    #[derive(Clone)]
    struct BrokenTransport;

    impl CompletionTransport for BrokenTransport {
        async fn send(
            &self,
            _request: &CompletionRequest,
        ) -> Result<TransportReply, TransportError> {
            Ok(TransportReply {
                status: UpstreamStatusCode::SERVICE_UNAVAILABLE,
                body: "down".to_string(),
            })
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
        }
    }

    async fn collect_events(
        transport: impl CompletionTransport + Clone + Send + Sync + 'static,
    ) -> Vec<StreamEvent> {
        let client = CompletionClient::new(transport, policy());
        let (tx, mut rx) = mpsc::channel(32);
        run_generation(client, "test-model".to_string(), "a plant app".to_string(), tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn one_failing_branch_does_not_affect_the_other_categories() {
        let events = collect_events(RoutedTransport::new(Some("GROWTH"))).await;

        assert!(matches!(events.first(), Some(StreamEvent::Summary { .. })));
        assert!(matches!(events.last(), Some(StreamEvent::Complete)));

        let successes: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Category { category, data } => {
                    assert_eq!(data, &serde_json::json!({"generated": true}));
                    Some(*category)
                }
                _ => None,
            })
            .collect();
        assert_eq!(successes.len(), 5);
        assert!(!successes.contains(&"growth"));

        let errors: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Error { category, .. } => Some(*category),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec!["growth"]);

        // summary + 6 branches + complete
        assert_eq!(events.len(), 8);
    }

    #[tokio::test]
    async fn all_branches_succeed_when_upstream_is_healthy() {
        let events = collect_events(RoutedTransport::new(None)).await;

        let categories: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Category { category, .. } => Some(*category),
                _ => None,
            })
            .collect();
        assert_eq!(categories.len(), Category::ALL.len());
        for category in Category::ALL {
            assert!(categories.contains(&category.name()));
        }
    }

    #[tokio::test]
    async fn summary_failure_ends_the_stream_without_fan_out() {
        let events = collect_events(BrokenTransport).await;

        assert_eq!(events.len(), 2);
        assert!(
            matches!(&events[0], StreamEvent::Error { category, .. } if *category == "summary")
        );
        assert!(matches!(events[1], StreamEvent::Complete));
    }

    #[tokio::test]
    async fn disconnected_consumer_stops_generation_before_any_upstream_call() {
        let transport = RoutedTransport::new(None);
        let calls = transport.calls.clone();
        let client = CompletionClient::new(transport, policy());

        let (tx, rx) = mpsc::channel(32);
        drop(rx);
        run_generation(client, "test-model".to_string(), "an idea".to_string(), tx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stream_events_serialize_with_type_tags() {
        let event = StreamEvent::Category {
            category: "vision",
            data: serde_json::json!({"ok": true}),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"category""#));
        assert!(json.contains(r#""category":"vision""#));

        let done = serde_json::to_string(&StreamEvent::Complete).unwrap();
        assert_eq!(done, r#"{"type":"complete"}"#);
    }
}
