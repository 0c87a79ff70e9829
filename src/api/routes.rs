//! REST endpoints for message analysis and session introspection.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::pipeline::orchestrator::ConversationOrchestrator;
use crate::pipeline::types::InboundMessage;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub api_key: SecretString,
}

/// Build the Axum router. Everything except `/api/health` requires the API key.
pub fn api_routes(orchestrator: Arc<ConversationOrchestrator>, api_key: SecretString) -> Router {
    let state = AppState {
        orchestrator,
        api_key,
    };

    let protected = Router::new()
        .route("/api/analyze-message", post(analyze_message))
        .route("/api/session/{id}", get(session_info))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/api/health", get(health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ErrorResponse = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (
        status,
        Json(json!({"status": "error", "message": message.into()})),
    )
}

fn pipeline_error_response(err: &PipelineError) -> ErrorResponse {
    let status = match err {
        PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::SessionClosed { .. } => StatusCode::CONFLICT,
    };
    error_response(status, err.to_string())
}

// ── Auth ────────────────────────────────────────────────────────────────

async fn require_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(provided) = headers.get(API_KEY_HEADER) else {
        return error_response(StatusCode::UNAUTHORIZED, "Missing x-api-key header").into_response();
    };

    if provided.as_bytes() != state.api_key.expose_secret().as_bytes() {
        warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        return error_response(StatusCode::FORBIDDEN, "Invalid API key").into_response();
    }

    next.run(request).await
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "service": "honeypot",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.orchestrator.active_sessions().await,
    }))
}

// ── Analysis ────────────────────────────────────────────────────────────

async fn analyze_message(
    State(state): State<AppState>,
    payload: Result<Json<InboundMessage>, JsonRejection>,
) -> Response {
    let Json(inbound) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection, "Malformed analyze request");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text()).into_response();
        }
    };

    info!(
        session_id = %inbound.session_id,
        sender = %inbound.message.sender,
        "Analyzing message"
    );

    match state.orchestrator.process(inbound).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => {
            debug!(error = %e, "Message rejected");
            pipeline_error_response(&e).into_response()
        }
    }
}

async fn session_info(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.orchestrator.session_snapshot(&id).await {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Session {id} not found")).into_response(),
    }
}
