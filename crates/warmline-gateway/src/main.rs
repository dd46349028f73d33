//! Warmline gateway: user chat surface + admin console over one axum router.
//!
//! Users talk to the assistant at `/`; the admin console at `/admin` polls the
//! same store, lists sessions unread-first, shows merged transcripts, injects
//! comments, and flips takeover. Admin API routes are optionally gated by
//! `WARMLINE_ADMIN_TOKEN` (header `x-admin-token`).

mod admin;
mod chat;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, Response},
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warmline_core::{
    ChatBridge, ConversationBuffer, NotificationBridge, SessionStore, TopicMap, TranscriptLog,
    WarmlineConfig, DEFAULT_LABEL,
};

/// Per-session state kept in memory between turns: the rolling buffer, the
/// active topic, and the last-activity instant for the inactivity reset.
pub struct SessionRuntime {
    pub current_topic: String,
    pub last_interaction: Instant,
    pub buffer: ConversationBuffer,
}

impl SessionRuntime {
    fn new(max_exchanges: usize, initial_topic: &str) -> Self {
        Self {
            current_topic: initial_topic.to_string(),
            last_interaction: Instant::now(),
            buffer: ConversationBuffer::new(max_exchanges),
        }
    }
}

pub struct AppState {
    pub config: WarmlineConfig,
    pub store: SessionStore,
    pub topics: TopicMap,
    pub bridge: Option<ChatBridge>,
    pub transcript: TranscriptLog,
    pub sessions: DashMap<String, SessionRuntime>,
    pub notifier: Mutex<NotificationBridge>,
}

impl AppState {
    /// Fetch or create the runtime for a session, applying the inactivity
    /// topic reset.
    pub fn touch_session(&self, session_id: &str) {
        let initial = self
            .topics
            .initial_label()
            .unwrap_or(DEFAULT_LABEL)
            .to_string();
        let mut runtime = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRuntime::new(self.config.max_exchanges, &initial));
        if runtime.last_interaction.elapsed().as_secs() > self.config.topic_reset_secs {
            info!("session {} idle — topic reset to default", session_id);
            runtime.current_topic = DEFAULT_LABEL.to_string();
        }
        runtime.last_interaction = Instant::now();
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WarmlineConfig::from_env();
    let topics = TopicMap::load(&config.topic_map_path);
    if topics.is_empty() {
        warn!("topic map is empty — every turn will use the default topic");
    }
    let bridge = ChatBridge::from_env(&config.model);
    if bridge.is_none() {
        warn!("no API key configured — chat will answer with an unavailable notice");
    }

    let state = Arc::new(AppState {
        store: SessionStore::new(&config.store_path),
        transcript: TranscriptLog::new(&config.transcript_path),
        topics,
        bridge,
        sessions: DashMap::new(),
        notifier: Mutex::new(NotificationBridge::new()),
        config: config.clone(),
    });

    let admin_api = Router::new()
        .route("/api/sessions", get(admin::sessions_feed))
        .route("/api/transcript/:session_id", get(admin::transcript))
        .route("/api/comment", post(admin::add_comment))
        .route("/api/release", post(admin::release_session))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    let app = Router::new()
        .route("/health", get(health))
        .route("/", get(serve_chat_ui))
        .route("/api/v1/session", post(chat::open_session))
        .route("/api/v1/chat", post(chat::chat))
        .route("/api/v1/comments/:session_id", get(chat::pending_comments))
        .route("/api/v1/status/:session_id", get(chat::session_status))
        .route("/admin", get(serve_admin_ui))
        .nest("/admin", admin_api)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("bind gateway address");
    info!("warmline gateway listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("serve gateway");
}

async fn health() -> &'static str {
    "OK"
}

/// User chat UI (embedded).
async fn serve_chat_ui() -> Html<&'static str> {
    const INDEX: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/index.html"));
    Html(INDEX)
}

/// Admin console UI (embedded). The console markup is public; the data routes
/// behind it are token-gated.
async fn serve_admin_ui() -> Html<&'static str> {
    const ADMIN: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/admin.html"));
    Html(ADMIN)
}

/// Reject admin API calls without the configured token. A missing
/// configuration leaves the console open (local single-operator setup).
async fn require_admin_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    if let Some(expected) = state.config.admin_token.as_deref() {
        let presented = request
            .headers()
            .get("x-admin-token")
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected) {
            return Err((StatusCode::UNAUTHORIZED, "admin token required".to_string()));
        }
    }
    Ok(next.run(request).await)
}
