//! OpenRouter chat bridge: blocking completions for classification, streaming
//! completions for assistant replies.
//!
//! API key: `warmline.toml` first, then `OPENROUTER_API_KEY`. Default model is
//! configured in [`crate::config::WarmlineConfig`]; any OpenRouter-compatible
//! `/chat/completions` endpoint works via `with_base_url`.

use crate::config::UserConfig;
use crate::error::BridgeError;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Chat-completions client. Holds no conversation state; callers pass the full
/// prompt each turn.
pub struct ChatBridge {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl ChatBridge {
    /// Key and model from `warmline.toml` with environment fallback.
    /// Returns `None` when no key is configured; the gateway then degrades to
    /// a generic unavailable message instead of calling out.
    pub fn from_env(default_model: &str) -> Option<Self> {
        let user_config = UserConfig::load().unwrap_or_default();
        let key = user_config.get_api_key()?;
        let mut bridge = Self::new(key).with_model(
            user_config
                .get_llm_model()
                .as_deref()
                .unwrap_or(default_model),
        );
        if let Some(url) = user_config.get_llm_api_url() {
            bridge = bridge.with_base_url(&url);
        }
        Some(bridge)
    }

    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model: "openai/gpt-4o".to_string(),
            base_url: OPENROUTER_API_BASE.to_string(),
            client,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn request_builder(&self, body: &ChatRequest) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://warmline.local")
            .header("X-Title", "Warmline")
            .header("Content-Type", "application/json")
            .json(body)
    }

    /// One-shot completion. Used by the router's classification call.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, BridgeError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            stream: false,
        };

        let res = self.request_builder(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(BridgeError::Api { status, body });
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| BridgeError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| BridgeError::Parse("no choices in response".to_string()))
    }

    /// Streaming completion: yields content deltas parsed from the upstream
    /// SSE body. Lines may split across chunks, so a carry buffer is kept.
    pub async fn stream(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<impl Stream<Item = Result<String, BridgeError>>, BridgeError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            stream: true,
        };

        let res = self.request_builder(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(BridgeError::Api { status, body });
        }

        let mut upstream = res.bytes_stream();
        let stream = async_stream::stream! {
            let mut carry = String::new();
            while let Some(chunk) = upstream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(BridgeError::Request(e));
                        return;
                    }
                };
                carry.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(pos) = carry.find('\n') {
                    let line = carry[..pos].trim().to_string();
                    carry.drain(..=pos);
                    let Some(payload) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if payload == "[DONE]" {
                        return;
                    }
                    if let Some(delta) = parse_delta(payload) {
                        if !delta.is_empty() {
                            yield Ok(delta);
                        }
                    }
                }
            }
        };
        Ok(stream)
    }
}

/// Extract the content delta from one SSE `data:` payload. Malformed payloads
/// are skipped rather than failing the whole stream.
fn parse_delta(payload: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(payload).ok()?;
    json["choices"][0]["delta"]["content"]
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delta_extracts_content() {
        let payload = r#"{"choices":[{"delta":{"content":"hello"}}]}"#;
        assert_eq!(parse_delta(payload).as_deref(), Some("hello"));
    }

    #[test]
    fn parse_delta_skips_role_only_chunks() {
        let payload = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_delta(payload), None);
    }

    #[test]
    fn parse_delta_skips_garbage() {
        assert_eq!(parse_delta("not json"), None);
    }
}
