//! Warmline configuration loaded from `.env` / environment.
//!
//! Paths, bind address, model tuning, and the admin token. Change behavior
//! without code edits.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Service configuration loaded from environment.
///
/// | Env | Default | Description |
/// |-----|---------|--------------|
/// | WARMLINE_BIND | 127.0.0.1:8000 | Gateway listen address. |
/// | WARMLINE_STORE_PATH | ./data/interactions.json | JSON interaction store. |
/// | WARMLINE_TOPIC_MAP | ./data/topic_map.json | Label -> {path, description} mapping. |
/// | WARMLINE_TRANSCRIPT_LOG | ./data/transcript.log | Append-only exchange audit. |
/// | WARMLINE_LLM_MODEL | openai/gpt-4o | Chat model (OpenRouter id). |
/// | WARMLINE_MAX_EXCHANGES | 6 | Rolling conversation window size. |
/// | WARMLINE_TOPIC_RESET_SECS | 300 | Inactivity window before the topic resets to default. |
/// | WARMLINE_ADMIN_TOKEN | unset | When set, `/admin` routes require `x-admin-token`. |
#[derive(Debug, Clone)]
pub struct WarmlineConfig {
    pub bind_addr: String,
    pub store_path: PathBuf,
    pub topic_map_path: PathBuf,
    pub transcript_path: PathBuf,
    pub model: String,
    pub max_exchanges: usize,
    pub topic_reset_secs: u64,
    pub admin_token: Option<String>,
    /// Sampling temperature for assistant replies.
    pub reply_temperature: f32,
    /// Token cap for assistant replies.
    pub reply_max_tokens: u32,
    /// Sampling temperature for the classification call.
    pub classify_temperature: f32,
    /// Token cap for the classification call (only a label name is expected).
    pub classify_max_tokens: u32,
}

impl Default for WarmlineConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            store_path: PathBuf::from("./data/interactions.json"),
            topic_map_path: PathBuf::from("./data/topic_map.json"),
            transcript_path: PathBuf::from("./data/transcript.log"),
            model: "openai/gpt-4o".to_string(),
            max_exchanges: 6,
            topic_reset_secs: 300,
            admin_token: None,
            reply_temperature: 0.9,
            reply_max_tokens: 3000,
            classify_temperature: 0.7,
            classify_max_tokens: 250,
        }
    }
}

impl WarmlineConfig {
    /// Load from environment. Unset or invalid => defaults (see struct docs).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_string("WARMLINE_BIND", &defaults.bind_addr),
            store_path: env_path("WARMLINE_STORE_PATH", &defaults.store_path),
            topic_map_path: env_path("WARMLINE_TOPIC_MAP", &defaults.topic_map_path),
            transcript_path: env_path("WARMLINE_TRANSCRIPT_LOG", &defaults.transcript_path),
            model: env_string("WARMLINE_LLM_MODEL", &defaults.model),
            max_exchanges: env_usize("WARMLINE_MAX_EXCHANGES", defaults.max_exchanges),
            topic_reset_secs: env_u64("WARMLINE_TOPIC_RESET_SECS", defaults.topic_reset_secs),
            admin_token: env_opt_string("WARMLINE_ADMIN_TOKEN"),
            ..defaults
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_path(name: &str, default: &Path) -> PathBuf {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| default.to_path_buf())
}

fn env_usize(name: &str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// User-specific configuration stored in `warmline.toml` (API key, model
/// override). Lets an operator provide credentials without touching the
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Personal OpenRouter (or compatible) API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Preferred chat model.
    #[serde(default)]
    pub llm_model: Option<String>,

    /// Alternate chat-completions base URL.
    #[serde(default)]
    pub llm_api_url: Option<String>,
}

impl UserConfig {
    pub fn default_path() -> PathBuf {
        PathBuf::from("warmline.toml")
    }

    /// Load from `warmline.toml`; a missing file yields the default (empty) config.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from_path(&Self::default_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// API key with environment fallback: warmline.toml > OPENROUTER_API_KEY.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Model override with environment fallback.
    pub fn get_llm_model(&self) -> Option<String> {
        self.llm_model
            .clone()
            .or_else(|| std::env::var("WARMLINE_LLM_MODEL").ok())
            .filter(|s| !s.trim().is_empty())
    }

    /// Base URL override with environment fallback.
    pub fn get_llm_api_url(&self) -> Option<String> {
        self.llm_api_url
            .clone()
            .or_else(|| std::env::var("WARMLINE_LLM_API_URL").ok())
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = WarmlineConfig::default();
        assert_eq!(cfg.max_exchanges, 6);
        assert_eq!(cfg.topic_reset_secs, 300);
        assert!(cfg.admin_token.is_none());
    }

    #[test]
    fn user_config_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = UserConfig::load_from_path(&dir.path().join("nope.toml")).unwrap();
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn user_config_parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warmline.toml");
        std::fs::write(&path, "api_key = \"sk-test\"\nllm_model = \"openai/gpt-4o-mini\"\n")
            .unwrap();
        let cfg = UserConfig::load_from_path(&path).unwrap();
        assert_eq!(cfg.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.llm_model.as_deref(), Some("openai/gpt-4o-mini"));
    }
}
