//! warmline-core: chat-assistant core with human handoff.
//!
//! Session store (single JSON document), topic router (LLM intent
//! classification over labeled document bundles), bounded conversation buffer,
//! notification bridge, and the OpenRouter chat bridge. The gateway crate
//! wires these into the user chat UI and the admin console.

mod config;
mod error;
mod history;
mod notify;
mod openrouter_service;
mod router;
mod session_store;
mod topic_map;

pub use config::{UserConfig, WarmlineConfig};
pub use error::{BridgeError, StoreError};
pub use history::{ConversationBuffer, TranscriptLog, DEFAULT_MAX_EXCHANGES};
pub use notify::NotificationBridge;
pub use openrouter_service::ChatBridge;
pub use router::{build_classify_prompt, resolve_label, TopicRouter};
pub use session_store::{
    now_rfc3339, AiReply, Comment, Interaction, SessionStore, SessionSummary,
};
pub use topic_map::{render_guidance, TopicEntry, TopicMap, DEFAULT_LABEL};
