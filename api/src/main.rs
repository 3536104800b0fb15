use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod extract;
mod fallback;
mod middleware;
mod prompts;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stratagem API",
        version = "0.1.0",
        description = "Turns a one-line business idea into a structured strategy tree, \
                       generated by a language model behind a retry and repair layer."
    ),
    paths(
        routes::health::health_check,
        routes::strategy::generate_strategy,
        routes::strategy_stream::stream_strategy,
        routes::node_chat::chat_about_node,
    ),
    components(schemas(
        HealthResponse,
        routes::strategy::GenerateStrategyRequest,
        routes::strategy::GenerateStrategyResponse,
        routes::strategy::GenerateStrategyMeta,
        routes::node_chat::NodeChatRequest,
        routes::node_chat::NodeChatResponse,
        stratagem_core::types::ChatMessage,
        stratagem_core::types::StrategyDocument,
        stratagem_core::error::ApiError,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether an upstream API key is configured; false means generation
    /// routes will fail until `LLM_API_KEY` is set.
    pub upstream_configured: bool,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stratagem_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app_state = state::AppState {
        llm: config::LlmSettings::from_env(),
    };

    if app_state.llm.api_key.is_none() {
        tracing::warn!("LLM_API_KEY is not set; generation routes will return errors");
    }

    let cors_layer = middleware::cors::build_cors_layer();

    // Router with per-endpoint rate limiting on the model-backed routes
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::strategy::router().layer(middleware::rate_limit::generation_layer()))
        .merge(routes::strategy_stream::router().layer(middleware::rate_limit::generation_layer()))
        .merge(routes::node_chat::router().layer(middleware::rate_limit::chat_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Stratagem API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
