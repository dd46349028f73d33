//! User chat surface: session open, streaming chat turns, comment polling,
//! and the takeover status probe.
//!
//! `POST /api/v1/chat` answers with SSE. Every event payload is a small JSON
//! object tagged by `type`: `delta` (assistant text), `handoff` (an admin holds
//! the session, no AI reply), `error` (generic failure notice), `done`.

use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{sse::Event, IntoResponse, Response, Sse},
    Json,
};
use futures_util::stream::{iter, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, warn};
use warmline_core::{Interaction, TopicRouter};

const UNAVAILABLE_NOTICE: &str =
    "The assistant is unavailable right now. Please try again in a moment.";

#[derive(Deserialize)]
pub struct OpenSessionRequest {
    pub user: String,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub user: String,
    pub message: String,
}

/// Mint a session id from the user name and the current unix time, mirroring
/// the `{username}{seconds}` convention of the stored data.
pub async fn open_session(Json(body): Json<OpenSessionRequest>) -> Json<serde_json::Value> {
    let session_id = mint_session_id(&body.user, chrono::Utc::now().timestamp());
    info!("opened session {}", session_id);
    Json(serde_json::json!({ "session_id": session_id }))
}

fn mint_session_id(user: &str, unix_seconds: i64) -> String {
    let slug: String = user
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    let slug = if slug.is_empty() { "guest".to_string() } else { slug };
    format!("{}{}", slug, unix_seconds)
}

/// One chat turn. Takeover short-circuits to a `handoff` event; otherwise the
/// turn is classified, grounded with the routed guidance document, streamed
/// from the model, and persisted once complete.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Response {
    if body.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "empty message".to_string()).into_response();
    }

    // Takeover path: record the message for the admin, skip the AI entirely.
    if state.store.is_admin_involved(&body.session_id) {
        let mut interaction =
            Interaction::new_user_turn(&body.session_id, &body.user, &body.message);
        interaction.admin_involved = true;
        if let Err(e) = state.store.append(interaction) {
            warn!("failed to record takeover message: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
        let events = vec![
            Ok::<_, Infallible>(tagged_event("handoff", None)),
            Ok(tagged_event("done", None)),
        ];
        return Sse::new(iter(events)).into_response();
    }

    state.touch_session(&body.session_id);

    let Some(bridge) = state.bridge.as_ref() else {
        return degraded_reply(&state, &body).await;
    };

    // Router: pick the knowledge document for this turn.
    let history = state
        .sessions
        .get(&body.session_id)
        .map(|r| r.buffer.render())
        .unwrap_or_default();
    let topic = TopicRouter::new(bridge, &state.topics)
        .with_sampling(
            state.config.classify_temperature,
            state.config.classify_max_tokens,
        )
        .classify(&body.message, &history)
        .await;
    if let Some(mut runtime) = state.sessions.get_mut(&body.session_id) {
        runtime.current_topic = topic.clone();
    }
    let guidance = state.topics.guidance_for(&topic);

    let system = build_system_prompt(&body.user, &guidance, &history);
    let upstream = match bridge
        .stream(
            &system,
            &body.message,
            state.config.reply_temperature,
            state.config.reply_max_tokens,
        )
        .await
    {
        Ok(s) => s,
        Err(e) => {
            warn!("chat stream failed to open: {}", e);
            let events = vec![
                Ok::<_, Infallible>(tagged_event("error", Some(UNAVAILABLE_NOTICE))),
                Ok(tagged_event("done", None)),
            ];
            return Sse::new(iter(events)).into_response();
        }
    };

    let stream = async_stream::stream! {
        futures_util::pin_mut!(upstream);
        let mut full_reply = String::new();
        let mut failed = false;
        while let Some(delta) = upstream.next().await {
            match delta {
                Ok(text) => {
                    full_reply.push_str(&text);
                    yield Ok::<_, Infallible>(tagged_event("delta", Some(text.as_str())));
                }
                Err(e) => {
                    warn!("chat stream interrupted: {}", e);
                    failed = true;
                    yield Ok(tagged_event("error", Some(UNAVAILABLE_NOTICE)));
                    break;
                }
            }
        }

        if !failed {
            finish_turn(&state, &body, &full_reply);
        }
        yield Ok(tagged_event("done", None));
    };

    Sse::new(stream).into_response()
}

/// No API key configured: record the turn with a canned notice so the admin
/// still sees the user's message.
async fn degraded_reply(state: &Arc<AppState>, body: &ChatRequest) -> Response {
    finish_turn(state, body, UNAVAILABLE_NOTICE);
    let events = vec![
        Ok::<_, Infallible>(tagged_event("delta", Some(UNAVAILABLE_NOTICE))),
        Ok(tagged_event("done", None)),
    ];
    Sse::new(iter(events)).into_response()
}

/// Persist a completed turn: rolling buffer, transcript audit, store append.
fn finish_turn(state: &Arc<AppState>, body: &ChatRequest, reply: &str) {
    let exchange = state
        .sessions
        .get_mut(&body.session_id)
        .map(|mut runtime| runtime.buffer.push(&body.user, &body.message, reply));
    if let Some(exchange) = exchange {
        state.transcript.append(&exchange);
    }
    let interaction = Interaction::new_user_turn(&body.session_id, &body.user, &body.message)
        .with_ai_reply(reply);
    if let Err(e) = state.store.append(interaction) {
        warn!("failed to persist chat turn: {}", e);
    }
}

/// System prompt: background line, routed guidance, and the rolling history.
fn build_system_prompt(user_name: &str, guidance: &str, history: &str) -> String {
    format!(
        "The user's name is {}.\n{}\n{}",
        user_name, guidance, history
    )
}

fn tagged_event(kind: &str, text: Option<&str>) -> Event {
    let payload = match text {
        Some(t) => serde_json::json!({ "type": kind, "text": t }),
        None => serde_json::json!({ "type": kind }),
    };
    Event::default().data(payload.to_string())
}

/// Undisplayed admin comments for a session, delivered exactly once.
pub async fn pending_comments(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let comments = state
        .store
        .take_undisplayed_comments(&session_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let payload: Vec<serde_json::Value> = comments
        .iter()
        .map(|c| {
            serde_json::json!({
                "user": c.user,
                "message": c.message,
                "timestamp": c.timestamp,
            })
        })
        .collect();
    Ok(Json(serde_json::json!({ "comments": payload })))
}

/// Takeover flag for the banner shown on the user side.
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "admin_involved": state.store.is_admin_involved(&session_id)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_slugs_the_user_name() {
        assert_eq!(mint_session_id("Dana Levi", 1735000000), "danalevi1735000000");
    }

    #[test]
    fn session_id_falls_back_to_guest() {
        assert_eq!(mint_session_id("!!!", 1735000000), "guest1735000000");
    }

    #[test]
    fn system_prompt_carries_name_guidance_and_history() {
        let prompt = build_system_prompt("Dana", "refunds:\n  30 days", "Dana: hi\nAI Assistant: hello");
        assert!(prompt.starts_with("The user's name is Dana."));
        assert!(prompt.contains("refunds:"));
        assert!(prompt.contains("AI Assistant: hello"));
    }
}
