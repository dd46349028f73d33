//! Admin console API: polled session feed with notification diff, merged
//! transcripts, comment injection, and takeover release.
//!
//! Pure read/filter/sort/render over the session store; takeover is a boolean
//! flag flip, not a state machine.

use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub struct CommentRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ReleaseRequest {
    pub session_id: String,
}

/// Session feed, unread-first then latest-first, plus `notify`: sessions whose
/// unread flag rose since the previous poll (the console fires a browser
/// notification per entry).
pub async fn sessions_feed(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let summaries = state.store.session_summaries();
    let notify = match state.notifier.lock() {
        Ok(mut bridge) => bridge.observe(state.store.new_message_sessions()),
        Err(_) => Vec::new(),
    };
    Json(serde_json::json!({
        "sessions": summaries,
        "notify": notify,
    }))
}

/// Merged transcript of one session, oldest first. Opening the transcript
/// clears the session's unread flags.
pub async fn transcript(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state
        .store
        .mark_session_read(&session_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let interactions = state.store.session_transcript(&session_id);
    let admin_involved = interactions.iter().any(|i| i.admin_involved);
    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "admin_involved": admin_involved,
        "interactions": interactions,
    })))
}

/// Attach a moderator comment to the latest interaction of the session and
/// begin takeover.
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if body.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "empty comment".to_string()));
    }
    state
        .store
        .append_comment(&body.session_id, "Admin", body.message.trim())
        .map_err(|e| {
            let status = match &e {
                warmline_core::StoreError::EmptySession(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string())
        })?;
    info!("admin took over session {}", body.session_id);
    Ok(Json(serde_json::json!({ "status": "comment added" })))
}

/// Return control to the AI: clear the takeover flag on every interaction of
/// the session.
pub async fn release_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReleaseRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state
        .store
        .set_admin_involved(&body.session_id, false)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    info!("session {} returned to the AI", body.session_id);
    Ok(Json(serde_json::json!({ "status": "released" })))
}
