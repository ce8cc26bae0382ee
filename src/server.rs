//! JSON HTTP surface.
//!
//! Thin adapters from HTTP to the operations in [`crate::ops`]: decode
//! the body, run the operation, encode the payload. All domain behavior
//! (validation, caching, fetching, synthesis, normalization) lives in
//! the operations layer.
//!
//! # Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | `POST` | `/api/university-score` | [`ops::university_score`] |
//! | `POST` | `/api/profile-match` | [`ops::profile_match`] |
//! | `POST` | `/api/budget-info` | [`ops::budget_info`] |
//! | `POST` | `/api/overall-insight` | [`ops::overall_insight`] |
//! | `POST` | `/api/required-documents` | [`ops::required_documents`] |
//! | `POST` | `/api/compare-universities` | [`ops::compare_universities`] |
//! | `GET`  | `/health` | liveness probe |
//!
//! # Error contract
//!
//! Every error body is `{ "error": "<message>" }`. Validation failures
//! are 400 with the reason verbatim. Everything else is 500 with one
//! fixed message; the real cause goes to the log only, so upstream
//! details never leak to clients.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::cache::ResponseCache;
use crate::completion::CompletionClient;
use crate::config::Config;
use crate::error::OpError;
use crate::ops::{self, OpContext};
use crate::reddit::RedditClient;

/// The one message 500 responses carry, whatever went wrong upstream.
const GENERIC_FAILURE: &str = "The service is temporarily unavailable. Please try again.";

/// Shared application state passed to handlers via Axum's `State`.
#[derive(Clone)]
struct AppState {
    ops: Arc<OpContext>,
}

/// Builds the full client stack from config and serves until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let cache = ResponseCache::connect(config.cache.url.as_deref()).await;
    let threads = RedditClient::new(Duration::from_secs(config.fetcher.timeout_secs))?;
    let synthesizer = CompletionClient::new(&config.completion)?;

    let ops = Arc::new(OpContext::new(
        Arc::new(threads),
        Arc::new(synthesizer),
        cache,
    ));
    run_server_with_ops(config, ops).await
}

/// Like [`run_server`], but with externally-built dependencies. Lets
/// integration tests serve the real HTTP surface over stub sources.
pub async fn run_server_with_ops(config: &Config, ops: Arc<OpContext>) -> anyhow::Result<()> {
    let app = router(AppState { ops }, config.server.client_origin.as_deref())?;

    let bind_addr = &config.server.bind;
    tracing::info!(addr = %bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState, client_origin: Option<&str>) -> anyhow::Result<Router> {
    let cors = cors_layer(client_origin)?;
    Ok(Router::new()
        .route("/api/university-score", post(handle_university_score))
        .route("/api/profile-match", post(handle_profile_match))
        .route("/api/budget-info", post(handle_budget_info))
        .route("/api/overall-insight", post(handle_overall_insight))
        .route("/api/required-documents", post(handle_required_documents))
        .route(
            "/api/compare-universities",
            post(handle_compare_universities),
        )
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state))
}

/// A configured origin locks CORS to that origin; otherwise any origin
/// is allowed.
fn cors_layer(client_origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    Ok(match client_origin {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid client origin: {origin}"))?;
            layer.allow_origin(origin)
        }
        None => layer.allow_origin(Any),
    })
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<OpError> for AppError {
    fn from(err: OpError) -> Self {
        match err {
            OpError::InvalidInput(message) => AppError {
                status: StatusCode::BAD_REQUEST,
                message,
            },
            other => {
                tracing::error!(error = %other, "operation failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: GENERIC_FAILURE.to_string(),
                }
            }
        }
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_university_score(
    State(state): State<AppState>,
    Json(request): Json<ops::UniversityScoreRequest>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(ops::university_score(&state.ops, request).await?))
}

async fn handle_profile_match(
    State(state): State<AppState>,
    Json(request): Json<ops::ProfileMatchRequest>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(ops::profile_match(&state.ops, request).await?))
}

async fn handle_budget_info(
    State(state): State<AppState>,
    Json(request): Json<ops::BudgetInfoRequest>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(ops::budget_info(&state.ops, request).await?))
}

async fn handle_overall_insight(
    State(state): State<AppState>,
    Json(request): Json<ops::OverallInsightRequest>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(ops::overall_insight(&state.ops, request).await?))
}

async fn handle_required_documents(
    State(state): State<AppState>,
    Json(request): Json<ops::RequiredDocumentsRequest>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(ops::required_documents(&state.ops, request).await?))
}

async fn handle_compare_universities(
    State(state): State<AppState>,
    Json(request): Json<ops::CompareUniversitiesRequest>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(ops::compare_universities(&state.ops, request).await?))
}
