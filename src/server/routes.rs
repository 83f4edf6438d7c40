//! HTTP routes:
//! - POST /api/chat
//! - POST /api/score
//! - GET /
//! - GET /health

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{ChatRequest, ScoreRequest, ScoreResponse};
use crate::scoring::Scorer;
use crate::server::error::ApiError;
use crate::server::extract::JsonBody;
use crate::server::streaming::text_stream_response;
use crate::upstream::{CompletionProvider, CompletionRequest};

pub const SERVICE_NAME: &str = "Final Cut Game AI Backend";

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn CompletionProvider>,
    pub scorer: Scorer,
}

impl AppState {
    pub fn new(config: Arc<Config>, provider: Arc<dyn CompletionProvider>) -> Self {
        let scorer = Scorer::new(provider.clone(), config.scoring.clone());
        Self {
            config,
            provider,
            scorer,
        }
    }
}

/// Build the axum router with all routes, CORS and request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    let api = Router::new()
        .route("/chat", post(chat))
        .route("/score", post(score));

    Router::new()
        .nest("/api", api)
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Only the configured origins, with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn chat(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ChatRequest>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id,
        story_id = req.story_id,
        character_id = req.character_id,
        messages = req.messages.len(),
        "Chat request"
    );

    let chat = &state.config.chat;
    let completion = CompletionRequest::new(
        chat.model.clone(),
        req.upstream_messages(),
        chat.max_tokens,
        chat.temperature,
    );

    let rx = state.provider.stream_chat(completion).await.map_err(|e| {
        error!(request_id, "Chat upstream failed: {e}");
        ApiError::Chat(e)
    })?;

    Ok(text_stream_response(rx))
}

async fn score(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ScoreRequest>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();

    let scored = state.scorer.score(&req).await.map_err(|e| {
        error!(request_id, "Scoring upstream failed: {e}");
        ApiError::Scoring(e)
    })?;

    info!(
        request_id,
        tier = %scored.tier,
        score = scored.score.score,
        "Reasoning scored"
    );

    Ok(Json(ScoreResponse::from(scored.score)))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: SERVICE_NAME,
        status: "running",
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
