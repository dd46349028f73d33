//! Topic router: asks the model which labeled document bundle fits the user's
//! request, then resolves the reply against known labels.
//!
//! No retry, no confidence threshold, no caching. Every failure path lands on
//! the `default` label so a bad classification never blocks a reply.

use crate::openrouter_service::ChatBridge;
use crate::topic_map::{TopicMap, DEFAULT_LABEL};
use tracing::{info, warn};

const CLASSIFY_SYSTEM: &str =
    "You are a helpful assistant that selects the most appropriate option based on the user's input.";

/// Stateless classifier over a [`TopicMap`].
pub struct TopicRouter<'a> {
    bridge: &'a ChatBridge,
    topics: &'a TopicMap,
    temperature: f32,
    max_tokens: u32,
}

impl<'a> TopicRouter<'a> {
    pub fn new(bridge: &'a ChatBridge, topics: &'a TopicMap) -> Self {
        Self {
            bridge,
            topics,
            temperature: 0.7,
            max_tokens: 250,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Classify a user message (with rolling history for context) into one of
    /// the map's labels. Empty map, API failure, or an unrecognized reply all
    /// resolve to `default`.
    pub async fn classify(&self, text: &str, history: &str) -> String {
        if self.topics.is_empty() {
            return DEFAULT_LABEL.to_string();
        }

        let prompt = build_classify_prompt(self.topics, text, history);
        let reply = match self
            .bridge
            .complete(CLASSIFY_SYSTEM, &prompt, self.temperature, self.max_tokens)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("classification call failed: {} — falling back to default", e);
                return DEFAULT_LABEL.to_string();
            }
        };

        match resolve_label(&reply, &self.topics.labels()) {
            Some(label) => {
                info!("routed to topic '{}'", label);
                label.to_string()
            }
            None => {
                info!("no label matched reply '{}' — routed to default", reply.trim());
                DEFAULT_LABEL.to_string()
            }
        }
    }
}

/// Classification prompt: enumerated option descriptions, the text, and the
/// conversation history, with an instruction to answer with the option name only.
pub fn build_classify_prompt(topics: &TopicMap, text: &str, history: &str) -> String {
    format!(
        "Given the text and the conversation history, determine which option from the list \
         is most appropriate for handling the user's request based on the descriptions below. \
         Please provide only the option name.\n\n\
         Options:\n{}\n\n\
         Text: {}\n\n\
         Conversation History: {}\n\n\
         Please provide only the option name.",
        topics.describe_options(),
        text,
        history
    )
}

/// Fuzzy resolution: the first label appearing as a case-insensitive substring
/// of the model reply wins.
pub fn resolve_label<'l>(reply: &str, labels: &[&'l str]) -> Option<&'l str> {
    let lowered = reply.to_lowercase();
    labels
        .iter()
        .find(|label| lowered.contains(&label.to_lowercase()))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_label_exact() {
        assert_eq!(resolve_label("billing", &["billing", "default"]), Some("billing"));
    }

    #[test]
    fn resolve_label_case_insensitive_substring() {
        assert_eq!(
            resolve_label("The best option is \"Billing\".", &["billing", "default"]),
            Some("billing")
        );
    }

    #[test]
    fn resolve_label_no_match() {
        assert_eq!(resolve_label("shipping", &["billing", "returns"]), None);
    }
}
