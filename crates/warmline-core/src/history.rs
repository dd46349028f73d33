//! Conversation buffer and transcript log.
//!
//! The buffer keeps the last N exchanges rendered as flat text and re-sent as
//! model context on every turn. Plain truncation from the front; no
//! summarization, no token budgeting. The transcript log is an append-only
//! plain-text audit of every exchange.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_MAX_EXCHANGES: usize = 6;

/// Bounded rolling window of rendered exchanges for one session.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    exchanges: VecDeque<String>,
    max_exchanges: usize,
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXCHANGES)
    }
}

impl ConversationBuffer {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            exchanges: VecDeque::with_capacity(max_exchanges.max(1)),
            max_exchanges: max_exchanges.max(1),
        }
    }

    /// Record one exchange, evicting the oldest when the window is full.
    /// Returns the rendered exchange for transcript logging.
    pub fn push(&mut self, user_name: &str, user_input: &str, ai_reply: &str) -> String {
        let exchange = format!("{}: {}\nAI Assistant: {}", user_name, user_input, ai_reply);
        self.exchanges.push_back(exchange.clone());
        while self.exchanges.len() > self.max_exchanges {
            self.exchanges.pop_front();
        }
        exchange
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Flat text block sent as model context.
    pub fn render(&self) -> String {
        self.exchanges
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Append-only plain-text audit of exchanges. Append failures are logged and
/// swallowed; the audit must never break a chat turn.
#[derive(Debug, Clone)]
pub struct TranscriptLog {
    path: PathBuf,
}

impl TranscriptLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn append(&self, exchange: &str) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}\n", exchange));
        if let Err(e) = result {
            warn!("transcript append to {:?} failed: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_truncates_to_window() {
        let mut buffer = ConversationBuffer::new(3);
        for i in 0..5 {
            buffer.push("Dana", &format!("question {}", i), &format!("answer {}", i));
        }
        assert_eq!(buffer.len(), 3);
        let rendered = buffer.render();
        assert!(!rendered.contains("question 0"));
        assert!(!rendered.contains("question 1"));
        assert!(rendered.contains("question 2"));
        assert!(rendered.contains("question 4"));
    }

    #[test]
    fn render_joins_with_blank_lines() {
        let mut buffer = ConversationBuffer::new(6);
        buffer.push("Dana", "hi", "hello");
        buffer.push("Dana", "how are you", "fine");
        let rendered = buffer.render();
        assert_eq!(
            rendered,
            "Dana: hi\nAI Assistant: hello\n\nDana: how are you\nAI Assistant: fine"
        );
    }

    #[test]
    fn transcript_appends_exchanges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.log");
        let log = TranscriptLog::new(&path);
        log.append("Dana: hi\nAI Assistant: hello");
        log.append("Dana: bye\nAI Assistant: later");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Dana: hi"));
        assert!(content.contains("later"));
    }
}
