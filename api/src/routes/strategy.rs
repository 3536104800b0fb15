//! Full-strategy generation: one idea in, one strategy document out.
//!
//! Two sequential upstream calls. The first generates the core strategy; the
//! second runs a competitor analysis seeded with context from the first. A
//! competitor-call failure degrades to placeholder entries rather than
//! failing a document the user already paid a model call for.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stratagem_core::client::CompletionClient;
use stratagem_core::transport::CompletionTransport;
use stratagem_core::types::{CompletionRequest, StrategyDocument};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::fallback;
use crate::prompts;
use crate::state::AppState;

const MAX_IDEA_LEN: usize = 2000;
const MAX_COMPETITORS: usize = 10;
const MIN_COMPETITORS: usize = 4;
const MAX_COMPETITOR_LABEL: usize = 30;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/strategy", post(generate_strategy))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GenerateStrategyRequest {
    /// One-line business idea to expand into a strategy tree
    pub idea: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GenerateStrategyResponse {
    /// The generated strategy document (free-form JSON object)
    pub strategy: StrategyDocument,
    pub meta: GenerateStrategyMeta,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GenerateStrategyMeta {
    pub generated_at: DateTime<Utc>,
    pub model: String,
    /// True when the canned demo document was served instead of a generated one
    pub demo: bool,
}

/// Shared input check for the generation routes. Runs before any network
/// call; callers of the API get a structured 400, not an upstream error.
pub(crate) fn validate_idea(idea: &str) -> Result<(), AppError> {
    let trimmed = idea.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation {
            message: "idea must not be empty".to_string(),
            field: Some("idea".to_string()),
            received: None,
            docs_hint: Some("Provide a one-line description of the business idea.".to_string()),
        });
    }
    if trimmed.chars().count() > MAX_IDEA_LEN {
        return Err(AppError::Validation {
            message: format!("idea must be at most {MAX_IDEA_LEN} characters"),
            field: Some("idea".to_string()),
            received: Some(serde_json::json!(trimmed.chars().count())),
            docs_hint: None,
        });
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/strategy",
    request_body = GenerateStrategyRequest,
    responses(
        (status = 200, description = "Strategy generated", body = GenerateStrategyResponse),
        (status = 400, description = "Missing or malformed idea", body = stratagem_core::error::ApiError),
        (status = 429, description = "Upstream persistently rate-limited", body = stratagem_core::error::ApiError),
        (status = 500, description = "Upstream misconfigured or response unusable", body = stratagem_core::error::ApiError)
    ),
    tag = "strategy"
)]
pub async fn generate_strategy(
    State(state): State<AppState>,
    AppJson(req): AppJson<GenerateStrategyRequest>,
) -> Result<Json<GenerateStrategyResponse>, AppError> {
    validate_idea(&req.idea)?;
    let idea = req.idea.trim();
    let client = state.llm.client()?;

    let request = CompletionRequest::from_prompt(&state.llm.model, prompts::strategy_prompt(idea));
    let mut strategy = match client.complete(&request).await {
        Ok(doc) => doc,
        Err(err) if state.llm.demo_fallback && degrades_to_demo(&err) => {
            tracing::warn!(error = %err, "serving demo fallback document");
            return Ok(Json(GenerateStrategyResponse {
                strategy: fallback::demo_strategy(),
                meta: GenerateStrategyMeta {
                    generated_at: Utc::now(),
                    model: state.llm.model.clone(),
                    demo: true,
                },
            }));
        }
        Err(err) => return Err(err.into()),
    };

    let competitors = fetch_competitors(&client, &state.llm.model, idea, &strategy).await;
    merge_competitors(&mut strategy, competitors);

    Ok(Json(GenerateStrategyResponse {
        strategy,
        meta: GenerateStrategyMeta {
            generated_at: Utc::now(),
            model: state.llm.model.clone(),
            demo: false,
        },
    }))
}

/// Failures the demo document may stand in for: the upstream being down or
/// its output being unusable. Caller mistakes (validation) and auth problems
/// still surface as errors.
fn degrades_to_demo(err: &stratagem_core::error::CompletionError) -> bool {
    use stratagem_core::error::CompletionError;
    matches!(
        err,
        CompletionError::ExhaustedRetries { .. } | CompletionError::UnparsableResponse(_)
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct Competitor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pitch: Option<String>,
    #[serde(default)]
    pub positioning: Option<String>,
}

/// Best-effort competitor lookup. Any failure here returns an empty list and
/// the document falls back to placeholder entries.
async fn fetch_competitors<T: CompletionTransport>(
    client: &CompletionClient<T>,
    model: &str,
    idea: &str,
    strategy: &StrategyDocument,
) -> Vec<Competitor> {
    let request = CompletionRequest::from_prompt(model, prompts::competitor_prompt(idea, strategy))
        .with_max_tokens(3000);

    let doc = match client.complete(&request).await {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(error = %err, "competitor lookup failed, continuing without");
            return Vec::new();
        }
    };

    match doc.get("competitors").cloned() {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "competitor list had unexpected shape");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

/// Flatten the competitor list into the `competitorN` / `competitorNDetail`
/// fields the renderer expects: capped at 10, padded to at least 4 with
/// placeholders so the competitor branch of the tree never renders empty.
pub(crate) fn merge_competitors(strategy: &mut StrategyDocument, competitors: Vec<Competitor>) {
    let mut fields = serde_json::Map::new();
    let mut count = 0usize;

    for competitor in competitors.into_iter().take(MAX_COMPETITORS) {
        count += 1;
        let label = short_label(&competitor.name);
        fields.insert(
            format!("competitor{count}"),
            serde_json::json!(format!("{label} - {}", competitor.description)),
        );

        let mut detail = format!("{}\n\n{}\n\n", competitor.name, competitor.description);
        if let Some(pitch) = &competitor.pitch {
            detail.push_str(&format!("Pitch: {pitch}\n\n"));
        }
        if let Some(url) = &competitor.url {
            detail.push_str(&format!("Landing page: {url}\n\n"));
        }
        if let Some(positioning) = &competitor.positioning {
            detail.push_str(&format!("Positioning: {positioning}"));
        }
        fields.insert(
            format!("competitor{count}Detail"),
            serde_json::json!(detail.trim_end()),
        );
    }

    while count < MIN_COMPETITORS {
        count += 1;
        fields.insert(
            format!("competitor{count}"),
            serde_json::json!(format!("Competitor {count} - to be analysed")),
        );
        fields.insert(
            format!("competitor{count}Detail"),
            serde_json::json!(format!("Competitor {count}\n\nTo be analysed in detail.")),
        );
    }

    strategy.insert("competitors", serde_json::Value::Object(fields));
}

fn short_label(name: &str) -> String {
    if name.chars().count() > MAX_COMPETITOR_LABEL {
        let head: String = name.chars().take(MAX_COMPETITOR_LABEL - 3).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_doc() -> StrategyDocument {
        serde_json::from_str("{}").unwrap()
    }

    fn competitor(name: &str) -> Competitor {
        Competitor {
            name: name.to_string(),
            description: "does a similar thing".to_string(),
            url: Some(format!("https://{}.example", name.to_lowercase())),
            pitch: Some("a pitch".to_string()),
            positioning: Some("differentiate on speed".to_string()),
        }
    }

    #[test]
    fn empty_idea_is_rejected() {
        assert!(matches!(
            validate_idea("   "),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn oversized_idea_is_rejected() {
        let idea = "x".repeat(MAX_IDEA_LEN + 1);
        assert!(matches!(
            validate_idea(&idea),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn reasonable_idea_passes_validation() {
        assert!(validate_idea("a marketplace for vintage synthesizers").is_ok());
    }

    #[test]
    fn merge_pads_to_four_placeholders_when_lookup_is_empty() {
        let mut doc = empty_doc();
        merge_competitors(&mut doc, Vec::new());
        let competitors = doc.get("competitors").unwrap();
        for i in 1..=4 {
            assert!(competitors.get(format!("competitor{i}")).is_some());
            assert!(competitors.get(format!("competitor{i}Detail")).is_some());
        }
        assert!(competitors.get("competitor5").is_none());
    }

    #[test]
    fn merge_caps_at_ten_competitors() {
        let mut doc = empty_doc();
        let many = (0..15).map(|i| competitor(&format!("Comp{i}"))).collect();
        merge_competitors(&mut doc, many);
        let competitors = doc.get("competitors").unwrap();
        assert!(competitors.get("competitor10").is_some());
        assert!(competitors.get("competitor11").is_none());
    }

    #[test]
    fn merge_builds_detail_from_all_known_fields() {
        let mut doc = empty_doc();
        merge_competitors(&mut doc, vec![competitor("Notion")]);
        let detail = doc
            .get("competitors")
            .and_then(|c| c.get("competitor1Detail"))
            .and_then(|v| v.as_str())
            .unwrap();
        assert!(detail.contains("Notion"));
        assert!(detail.contains("Pitch: a pitch"));
        assert!(detail.contains("Landing page: https://notion.example"));
        assert!(detail.contains("Positioning: differentiate on speed"));
    }

    #[test]
    fn long_competitor_names_are_truncated_in_the_label() {
        let mut doc = empty_doc();
        merge_competitors(
            &mut doc,
            vec![competitor("An Extremely Long Competitor Company Name Inc")],
        );
        let label = doc
            .get("competitors")
            .and_then(|c| c.get("competitor1"))
            .and_then(|v| v.as_str())
            .unwrap();
        assert!(label.starts_with("An Extremely Long"));
        assert!(label.contains("..."));
        let name_part = label.split(" - ").next().unwrap();
        assert_eq!(name_part.chars().count(), MAX_COMPETITOR_LABEL);
    }
}
