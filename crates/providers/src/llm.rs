//! The language-model provider contract (spec §6): request/response, text
//! plus an optional image in, a single structured document out. Adapted
//! from an Anthropic Messages API adapter — trimmed to the one call shape
//! the Turn Orchestrator needs (no tool use, no streaming, no embeddings),
//! since the orchestrator calls the LLM exactly once per turn and parses
//! its own structured schema out of the response text.

use serde_json::Value;

use tutor_domain::error::{Error, Result};
use tutor_domain::session::{Role, Turn};

use crate::util::from_reqwest;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One turn's worth of LLM input: the system prompt, prior history, the
/// triggering utterance, and an optional board snapshot image.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub history: Vec<Turn>,
    pub user_text: String,
    /// `(base64_png, media_type)`, e.g. `("iVBOR...", "image/png")`.
    pub image: Option<(String, String)>,
    pub max_tokens: u32,
}

/// Trait every LLM adapter implements. A single non-streaming call that
/// returns the model's raw text; the orchestrator is responsible for
/// strict-parsing that text into an `LlmResult` (spec §4.3 step 6, §7).
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, req: &LlmRequest) -> Result<String>;
}

/// Anthropic Messages API adapter.
pub struct AnthropicLlmProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicLlmProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, "https://api.anthropic.com".to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn build_body(&self, req: &LlmRequest) -> Value {
        let mut messages: Vec<Value> = req
            .history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::Student => "user",
                    Role::Tutor => "assistant",
                };
                serde_json::json!({ "role": role, "content": turn.content })
            })
            .collect();

        let mut content_parts: Vec<Value> = vec![serde_json::json!({
            "type": "text",
            "text": req.user_text,
        })];
        if let Some((data, media_type)) = &req.image {
            content_parts.push(serde_json::json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": media_type,
                    "data": data,
                }
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": content_parts,
        }));

        serde_json::json!({
            "model": req.model,
            "system": req.system_prompt,
            "messages": messages,
            "max_tokens": req.max_tokens,
            "stream": false,
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicLlmProvider {
    async fn complete(&self, req: &LlmRequest) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_body(req);

        tracing::debug!(url = %url, "llm turn call");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: "anthropic".into(),
                message: format!("HTTP {} - {}", status.as_u16(), text),
            });
        }

        let body: Value = serde_json::from_str(&text)?;
        let content = body
            .get("content")
            .and_then(|v| v.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_body_includes_image_when_present() {
        let provider = AnthropicLlmProvider::new("test-key".into()).unwrap();
        let req = LlmRequest {
            model: "claude-sonnet-4-5".into(),
            system_prompt: "you are a tutor".into(),
            history: vec![Turn::student("hi")],
            user_text: "what is 2+2".into(),
            image: Some(("base64data".into(), "image/png".into())),
            max_tokens: 1024,
        };
        let body = provider.build_body(&req);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        let last_content = messages[1]["content"].as_array().unwrap();
        assert_eq!(last_content.len(), 2);
        assert_eq!(last_content[1]["type"], "image");
    }

    #[test]
    fn build_body_omits_image_when_absent() {
        let provider = AnthropicLlmProvider::new("test-key".into()).unwrap();
        let req = LlmRequest {
            model: "claude-sonnet-4-5".into(),
            system_prompt: "you are a tutor".into(),
            history: vec![],
            user_text: "hello".into(),
            image: None,
            max_tokens: 1024,
        };
        let body = provider.build_body(&req);
        let messages = body["messages"].as_array().unwrap();
        let content = messages[0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
    }
}
