//! Topic map: intent labels mapped to knowledge documents.
//!
//! The mapping file is JSON of the form
//! `{"label": {"path": "docs/foo.json", "description": "..."}}`. The reserved
//! label `default` is the router's fallback. Each document is itself JSON; it
//! is flattened into an indented plain-text guidance block for prompt injection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// The router's fallback label.
pub const DEFAULT_LABEL: &str = "default";

/// One labeled document bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicEntry {
    pub path: String,
    pub description: String,
}

/// Ordered label -> entry mapping.
#[derive(Debug, Clone, Default)]
pub struct TopicMap {
    entries: BTreeMap<String, TopicEntry>,
}

impl TopicMap {
    /// Load the mapping file. Missing or malformed files degrade to an empty
    /// map with a warning; routing then always resolves to `default`.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                warn!("topic map {:?} unreadable: {} — routing disabled", path, e);
                return Self::default();
            }
        };
        match serde_json::from_str::<BTreeMap<String, TopicEntry>>(&raw) {
            Ok(entries) => Self { entries },
            Err(e) => {
                warn!("topic map {:?} is not valid JSON: {} — routing disabled", path, e);
                Self::default()
            }
        }
    }

    pub fn from_entries(entries: BTreeMap<String, TopicEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn get(&self, label: &str) -> Option<&TopicEntry> {
        self.entries.get(label)
    }

    /// First non-default label, used before any classification has run.
    pub fn initial_label(&self) -> Option<&str> {
        self.entries
            .keys()
            .map(String::as_str)
            .find(|l| *l != DEFAULT_LABEL)
    }

    /// `- "label": "description"` listing for the classification prompt.
    pub fn describe_options(&self) -> String {
        self.entries
            .iter()
            .map(|(label, entry)| format!("- \"{}\": \"{}\"", label, entry.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Load the document mapped to `label` and flatten it to guidance text.
    /// Unknown label or unreadable document yields empty guidance.
    pub fn guidance_for(&self, label: &str) -> String {
        let Some(entry) = self.entries.get(label) else {
            warn!("no topic entry for label '{}'", label);
            return String::new();
        };
        let raw = match fs::read_to_string(&entry.path) {
            Ok(s) => s,
            Err(e) => {
                warn!("guidance document {:?} unreadable: {}", entry.path, e);
                return String::new();
            }
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => render_guidance(&value, 0),
            Err(e) => {
                warn!("guidance document {:?} is not valid JSON: {}", entry.path, e);
                String::new()
            }
        }
    }
}

/// Flatten a JSON document into indented plain text: object keys become
/// headers, scalars become lines, depth becomes indentation.
pub fn render_guidance(value: &serde_json::Value, depth: usize) -> String {
    let indent = " ".repeat(depth);
    match value {
        serde_json::Value::Object(map) => {
            let mut out = Vec::new();
            for (key, child) in map {
                out.push(format!("{}{}:", indent, key));
                out.push(render_guidance(child, depth + 2));
            }
            out.join("\n")
        }
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| render_guidance(item, depth + 2))
            .collect::<Vec<_>>()
            .join("\n"),
        other => format!("{}{}", indent, scalar_to_string(other)),
    }
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> TopicMap {
        let mut entries = BTreeMap::new();
        entries.insert(
            "billing".to_string(),
            TopicEntry {
                path: "docs/billing.json".to_string(),
                description: "Questions about invoices and payments".to_string(),
            },
        );
        entries.insert(
            DEFAULT_LABEL.to_string(),
            TopicEntry {
                path: "docs/general.json".to_string(),
                description: "Anything else".to_string(),
            },
        );
        TopicMap::from_entries(entries)
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let map = TopicMap::load("/definitely/not/here.json");
        assert!(map.is_empty());
    }

    #[test]
    fn initial_label_skips_default() {
        assert_eq!(sample_map().initial_label(), Some("billing"));
    }

    #[test]
    fn describe_options_lists_all_labels() {
        let listing = sample_map().describe_options();
        assert!(listing.contains("- \"billing\": \"Questions about invoices and payments\""));
        assert!(listing.contains("- \"default\""));
    }

    #[test]
    fn render_guidance_flattens_nested_json() {
        let doc = serde_json::json!({
            "refunds": {
                "policy": "30 days",
                "steps": ["open a ticket", "attach the invoice"]
            }
        });
        let text = render_guidance(&doc, 0);
        assert!(text.contains("refunds:"));
        assert!(text.contains("  policy:"));
        assert!(text.contains("30 days"));
        assert!(text.contains("open a ticket"));
    }
}
