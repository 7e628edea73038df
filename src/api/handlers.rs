//! HTTP request handlers

use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, SessionListResponse, SessionResponse,
    SessionSummary, SuccessResponse,
};
use super::{types::present_segment, AppState};
use crate::session::SessionError;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Header carrying a caller-forwarded access token, as set by hosted app
/// proxies in front of this service.
const FORWARDED_TOKEN_HEADER: &str = "x-forwarded-access-token";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/new", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/chat", post(send_chat))
        .route("/api/sessions/:id/clear", post(clear_session))
        .route("/api/sessions/:id/delete", post(delete_session))
        .route("/healthz", get(healthz))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    let sessions = state
        .sessions
        .list()
        .iter()
        .map(SessionSummary::from)
        .collect();

    Json(SessionListResponse { sessions })
}

async fn create_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.sessions.create();
    tracing::info!(session_id = %session.id, "Created session");
    Json(SessionResponse { session })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(&id)?;
    Ok(Json(SessionResponse { session }))
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }

    let auth_override = headers
        .get(FORWARDED_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    let output = state
        .sessions
        .send_message(&id, req.text.trim(), auth_override)
        .await?;

    let turns = state.sessions.get(&id)?.turns;

    Ok(Json(ChatResponse {
        segments: output.segments.into_iter().map(present_segment).collect(),
        turns,
    }))
}

// ============================================================
// Lifecycle
// ============================================================

async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.clear(&id)?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.remove(&id)?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Health / Version
// ============================================================

async fn healthz() -> &'static str {
    "ok"
}

async fn get_version() -> &'static str {
    concat!("talent-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(id) => AppError::NotFound(format!("Session not found: {id}")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
