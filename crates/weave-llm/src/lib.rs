//! Thin text-generation client behind the core `TextModel` trait.
//!
//! Speaks the OpenAI-compatible chat-completions API, which also covers
//! Ollama, vLLM, Groq, OpenRouter, and friends via `base_url`. The
//! translator is the only consumer, so every failure here surfaces as
//! `WeaveError::Translation`: the engine's contract stays untouched by
//! model latency or flakiness.

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use weave_core::config::ModelConfig;
use weave_core::error::{Result, WeaveError};
use weave_core::traits::TextModel;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiClient {
    http: Client,
    config: ModelConfig,
}

impl OpenAiClient {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatRequestMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatRequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl TextModel for OpenAiClient {
    fn generate(&self, prompt: String) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let url = self
                .config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_API_URL.to_string());

            let request = ChatRequest {
                model: self.config.model_id.clone(),
                messages: vec![ChatRequestMessage {
                    role: "user",
                    content: prompt,
                }],
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                stream: false,
            };

            let mut builder = self.http.post(&url).json(&request);
            if let Some(ref key) = self.config.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| WeaveError::Translation(format!("model request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(WeaveError::Translation(format!(
                    "model returned {}: {}",
                    status, body
                )));
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| WeaveError::Translation(format!("bad model response: {}", e)))?;

            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| {
                    WeaveError::Translation("model response had no content".to_string())
                })?;

            debug!(model = %self.config.model_id, chars = content.len(), "Model generation complete");
            Ok(content)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"a ; b ; SKIP"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("a ; b ; SKIP")
        );
    }

    #[test]
    fn test_response_without_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn test_request_shape() {
        let req = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatRequestMessage {
                role: "user",
                content: "hi".into(),
            }],
            max_tokens: 64,
            temperature: 0.0,
            stream: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
