//! JSON-file interaction store.
//!
//! One flat document holds every interaction across all sessions. Every
//! operation is a whole-file read-modify-write: no locking, no atomicity, no
//! retry. Concurrent writers can clobber each other — accepted by design scope.
//!
//! A missing, empty, or corrupt file degrades to an empty list on load. Legacy
//! files wrap the interaction list in a singleton outer list; the store loads
//! both forms and always writes the flat form.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Assistant half of an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AiReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Moderator comment attached to an interaction. Delivered to the user exactly
/// once: `comment_displayed` flips true on first retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub user: String,
    pub message: String,
    pub timestamp: String,
    #[serde(default)]
    pub comment_displayed: bool,
}

/// One user turn: the message, its optional AI reply, moderator comments, and
/// the takeover / unread flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub session_id: String,
    pub user: String,
    pub message: String,
    /// RFC 3339 UTC. Read-time ordering is lexicographic on this string.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiReply>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub admin_involved: bool,
    #[serde(default)]
    pub new_user_message: bool,
}

impl Interaction {
    /// A fresh user turn. The AI reply is attached by the caller once streamed.
    pub fn new_user_turn(session_id: &str, user: &str, message: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            user: user.to_string(),
            message: message.to_string(),
            timestamp: now_rfc3339(),
            ai: None,
            comments: Vec::new(),
            admin_involved: false,
            new_user_message: true,
        }
    }

    pub fn with_ai_reply(mut self, message: &str) -> Self {
        self.ai = Some(AiReply {
            message: message.to_string(),
            timestamp: now_rfc3339(),
        });
        self
    }
}

/// Per-session rollup for the admin console feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub has_new_message: bool,
    /// Latest interaction timestamp seen for this session (empty if none carried one).
    pub last_timestamp: String,
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Interaction store over a single JSON file.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every interaction. Missing file, empty file, or malformed JSON all
    /// degrade to an empty list.
    pub fn load(&self) -> Vec<Interaction> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("interaction store at {:?} is not valid JSON: {}", self.path, e);
                return Vec::new();
            }
        };
        // Legacy files nest the interaction list inside a singleton outer list.
        let list = match value {
            serde_json::Value::Array(ref outer)
                if outer.len() == 1 && outer[0].is_array() =>
            {
                outer[0].clone()
            }
            other => other,
        };
        match serde_json::from_value(list) {
            Ok(interactions) => interactions,
            Err(e) => {
                warn!("interaction store at {:?} has an unexpected shape: {}", self.path, e);
                Vec::new()
            }
        }
    }

    /// Persist the full interaction list (flat form, pretty-printed).
    pub fn save(&self, interactions: &[Interaction]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(interactions)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Append one interaction.
    pub fn append(&self, interaction: Interaction) -> Result<(), StoreError> {
        let mut data = self.load();
        data.push(interaction);
        self.save(&data)
    }

    /// Attach a moderator comment to the latest interaction of a session and
    /// mark that interaction as admin-involved.
    pub fn append_comment(
        &self,
        session_id: &str,
        user: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let mut data = self.load();
        let latest = data
            .iter_mut()
            .filter(|i| i.session_id == session_id)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
            .ok_or_else(|| StoreError::EmptySession(session_id.to_string()))?;
        latest.comments.push(Comment {
            user: user.to_string(),
            message: message.to_string(),
            timestamp: now_rfc3339(),
            comment_displayed: false,
        });
        latest.admin_involved = true;
        self.save(&data)
    }

    /// Drain undisplayed comments for a session, flipping their display flag so
    /// each comment is delivered exactly once.
    pub fn take_undisplayed_comments(&self, session_id: &str) -> Result<Vec<Comment>, StoreError> {
        let mut data = self.load();
        let mut taken = Vec::new();
        for interaction in data.iter_mut().filter(|i| i.session_id == session_id) {
            for comment in interaction.comments.iter_mut() {
                if !comment.comment_displayed {
                    comment.comment_displayed = true;
                    taken.push(comment.clone());
                }
            }
        }
        if !taken.is_empty() {
            self.save(&data)?;
        }
        Ok(taken)
    }

    /// Flip the takeover flag on every interaction of a session.
    pub fn set_admin_involved(&self, session_id: &str, involved: bool) -> Result<(), StoreError> {
        let mut data = self.load();
        let mut changed = false;
        for interaction in data.iter_mut().filter(|i| i.session_id == session_id) {
            if interaction.admin_involved != involved {
                interaction.admin_involved = involved;
                changed = true;
            }
        }
        if changed {
            self.save(&data)?;
        }
        Ok(())
    }

    /// True when any interaction of the session carries the takeover flag.
    pub fn is_admin_involved(&self, session_id: &str) -> bool {
        self.load()
            .iter()
            .any(|i| i.session_id == session_id && i.admin_involved)
    }

    /// Clear the unread flag on every interaction of a session (called when the
    /// admin opens the transcript).
    pub fn mark_session_read(&self, session_id: &str) -> Result<(), StoreError> {
        let mut data = self.load();
        let mut changed = false;
        for interaction in data.iter_mut().filter(|i| i.session_id == session_id) {
            if interaction.new_user_message {
                interaction.new_user_message = false;
                changed = true;
            }
        }
        if changed {
            self.save(&data)?;
        }
        Ok(())
    }

    /// Interactions of one session, oldest first.
    pub fn session_transcript(&self, session_id: &str) -> Vec<Interaction> {
        let mut interactions: Vec<Interaction> = self
            .load()
            .into_iter()
            .filter(|i| i.session_id == session_id)
            .collect();
        interactions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        interactions
    }

    /// One summary per session, unread-first then latest-first.
    pub fn session_summaries(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = Vec::new();
        for interaction in self.load() {
            if interaction.session_id.is_empty() {
                continue;
            }
            match summaries
                .iter_mut()
                .find(|s| s.session_id == interaction.session_id)
            {
                Some(summary) => {
                    summary.has_new_message |= interaction.new_user_message;
                    if interaction.timestamp > summary.last_timestamp {
                        summary.last_timestamp = interaction.timestamp.clone();
                    }
                }
                None => summaries.push(SessionSummary {
                    session_id: interaction.session_id.clone(),
                    has_new_message: interaction.new_user_message,
                    last_timestamp: interaction.timestamp.clone(),
                }),
            }
        }
        summaries.sort_by(|a, b| {
            b.has_new_message
                .cmp(&a.has_new_message)
                .then_with(|| b.last_timestamp.cmp(&a.last_timestamp))
        });
        summaries
    }

    /// Session ids currently carrying an unread user message (notification feed).
    pub fn new_message_sessions(&self) -> HashSet<String> {
        self.load()
            .into_iter()
            .filter(|i| i.new_user_message)
            .map(|i| i.session_id)
            .collect()
    }
}
