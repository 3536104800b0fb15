//! Contextual chat on a single node of the strategy tree. The model is asked
//! for short prose here, not JSON, so the route goes through `complete_text`
//! and skips the repair stage entirely.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use stratagem_core::types::{ChatMessage, CompletionRequest};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::prompts;
use crate::state::AppState;

const MAX_HISTORY_TURNS: usize = 50;
const CHAT_MAX_TOKENS: u32 = 300;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/node/chat", post(chat_about_node))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct NodeChatRequest {
    /// Title of the node being refined
    pub node_title: String,
    /// Current content of the node (optional)
    #[serde(default)]
    pub node_content: Option<String>,
    /// The user's new message
    pub message: String,
    /// Prior conversation turns, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct NodeChatResponse {
    /// The assistant's reply
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/v1/node/chat",
    request_body = NodeChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = NodeChatResponse),
        (status = 400, description = "Missing title/message or malformed history", body = stratagem_core::error::ApiError),
        (status = 429, description = "Upstream persistently rate-limited", body = stratagem_core::error::ApiError),
        (status = 500, description = "Upstream misconfigured or empty response", body = stratagem_core::error::ApiError)
    ),
    tag = "strategy"
)]
pub async fn chat_about_node(
    State(state): State<AppState>,
    AppJson(req): AppJson<NodeChatRequest>,
) -> Result<Json<NodeChatResponse>, AppError> {
    let messages = build_messages(&req)?;
    let client = state.llm.client()?;

    let request = CompletionRequest::from_messages(&state.llm.model, messages)
        .with_max_tokens(CHAT_MAX_TOKENS);
    let message = client.complete_text(&request).await?;

    Ok(Json(NodeChatResponse { message }))
}

/// Validate the request and assemble the upstream conversation:
/// system context, prior turns, then the new user message.
fn build_messages(req: &NodeChatRequest) -> Result<Vec<ChatMessage>, AppError> {
    if req.node_title.trim().is_empty() {
        return Err(AppError::Validation {
            message: "node_title must not be empty".to_string(),
            field: Some("node_title".to_string()),
            received: None,
            docs_hint: None,
        });
    }
    if req.message.trim().is_empty() {
        return Err(AppError::Validation {
            message: "message must not be empty".to_string(),
            field: Some("message".to_string()),
            received: None,
            docs_hint: None,
        });
    }
    if req.history.len() > MAX_HISTORY_TURNS {
        return Err(AppError::Validation {
            message: format!("history must contain at most {MAX_HISTORY_TURNS} turns"),
            field: Some("history".to_string()),
            received: Some(serde_json::json!(req.history.len())),
            docs_hint: Some("Trim older turns client-side; the node context is resent anyway.".to_string()),
        });
    }
    for (index, turn) in req.history.iter().enumerate() {
        if turn.role != "user" && turn.role != "assistant" {
            return Err(AppError::Validation {
                message: format!("history[{index}].role must be \"user\" or \"assistant\""),
                field: Some(format!("history[{index}].role")),
                received: Some(serde_json::json!(turn.role)),
                docs_hint: None,
            });
        }
    }

    let node_content = req.node_content.as_deref().unwrap_or("");
    let mut messages = Vec::with_capacity(req.history.len() + 2);
    messages.push(ChatMessage::system(prompts::node_chat_system_prompt(
        req.node_title.trim(),
        node_content,
    )));
    messages.extend(req.history.iter().cloned());
    messages.push(ChatMessage::user(req.message.trim()));
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(history: Vec<ChatMessage>) -> NodeChatRequest {
        NodeChatRequest {
            node_title: "Persona".to_string(),
            node_content: Some("Remote team leads".to_string()),
            message: "Can we narrow this down?".to_string(),
            history,
        }
    }

    #[test]
    fn messages_are_system_then_history_then_user() {
        let history = vec![
            ChatMessage::user("What about freelancers?"),
            ChatMessage::assistant("Freelancers churn faster; teams retain better."),
        ];
        let messages = build_messages(&request(history)).expect("valid request");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("Persona"));
        assert!(messages[0].content.contains("Remote team leads"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].role, "user");
        assert_eq!(messages[3].content, "Can we narrow this down?");
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut req = request(Vec::new());
        req.node_title = "  ".to_string();
        assert!(matches!(
            build_messages(&req),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn blank_message_is_rejected() {
        let mut req = request(Vec::new());
        req.message = String::new();
        assert!(matches!(
            build_messages(&req),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn unknown_history_role_is_rejected() {
        let history = vec![ChatMessage::system("sneaky system override")];
        assert!(matches!(
            build_messages(&request(history)),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn oversized_history_is_rejected() {
        let history = (0..MAX_HISTORY_TURNS + 1)
            .map(|i| ChatMessage::user(format!("turn {i}")))
            .collect();
        assert!(matches!(
            build_messages(&request(history)),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn missing_node_content_defaults_to_empty() {
        let mut req = request(Vec::new());
        req.node_content = None;
        let messages = build_messages(&req).expect("valid request");
        assert!(messages[0].content.contains("Current content: \n"));
    }
}
