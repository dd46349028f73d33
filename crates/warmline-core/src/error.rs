//! Error taxonomy: store failures and LLM bridge failures.
//!
//! Degraded reads (missing or corrupt store file) are not errors — the store
//! returns an empty list for those and logs at warn level.

use thiserror::Error;

/// Failures while persisting or mutating the interaction store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Mutation targeted a session with no interactions (e.g. commenting into
    /// an empty session).
    #[error("session '{0}' has no interactions")]
    EmptySession(String),
}

/// Failures while talking to the chat-completions API.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no API key configured (warmline.toml or OPENROUTER_API_KEY)")]
    MissingKey,

    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("chat API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("chat response parse failed: {0}")]
    Parse(String),
}
