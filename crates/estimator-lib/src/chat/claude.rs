//! Anthropic Claude backend (Messages API)

use super::{http_client, require_key, ChatConfig, ChatProvider, ProviderKind};
use crate::error::ChatError;
use crate::models::ChatReply;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

pub const CLAUDE_DEFAULT_MODEL: &str = "claude-haiku-4-5";

/// Completion budget per reply
pub const CLAUDE_MAX_TOKENS: u32 = 800;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const PROVIDER: &str = "claude";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Claude chat backend
pub struct ClaudeProvider {
    api_key: String,
    client: Client,
    model: String,
    base_url: String,
}

impl ClaudeProvider {
    /// Initialize from config; fails without an API key
    pub fn from_config(config: &ChatConfig, model: Option<&str>) -> Result<Self, ChatError> {
        let api_key = require_key(ProviderKind::Claude, config.anthropic_api_key.as_deref())?;
        Ok(Self {
            api_key,
            client: http_client(ProviderKind::Claude, config.timeout)?,
            model: model.unwrap_or(CLAUDE_DEFAULT_MODEL).to_string(),
            base_url: config.anthropic_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn extract_text(response: MessagesResponse) -> Result<String, ChatError> {
        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(ChatError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text)
    }

    fn map_api_error(status: u16, body: &str) -> ChatError {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map_or_else(|_| body.to_string(), |e| e.error.message);
        ChatError::Api {
            provider: PROVIDER,
            status,
            message,
        }
    }
}

#[async_trait]
impl ChatProvider for ClaudeProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<ChatReply, ChatError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: CLAUDE_MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, "Sending request to Anthropic API");
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "Anthropic API error");
            return Err(Self::map_api_error(status.as_u16(), &body));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)?;
        Ok(ChatReply::new(Self::extract_text(parsed)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(base_url: &str) -> ChatConfig {
        ChatConfig {
            provider: "claude".to_string(),
            anthropic_api_key: Some("sk-test".to_string()),
            anthropic_base_url: base_url.to_string(),
            ..ChatConfig::default()
        }
    }

    #[test]
    fn test_missing_key_fails_init() {
        let err = ClaudeProvider::from_config(&ChatConfig::default(), None).err().unwrap();
        assert!(matches!(err, ChatError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "claude-haiku-4-5",
                "max_tokens": 800,
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":[{"type":"text","text":"Drink water."}]}"#)
            .create_async()
            .await;

        let provider = ClaudeProvider::from_config(&config(&server.url()), None).unwrap();
        let reply = provider.generate("hi").await.unwrap();
        assert_eq!(reply.text, "Drink water.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_message_extracted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let provider = ClaudeProvider::from_config(&config(&server.url()), None).unwrap();
        let err = provider.generate("hi").await.unwrap_err();
        assert_eq!(err.to_string(), "claude API error (401): invalid x-api-key");
    }

    #[tokio::test]
    async fn test_non_text_blocks_ignored() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"tool_use","id":"x"}]}"#)
            .create_async()
            .await;

        let provider = ClaudeProvider::from_config(&config(&server.url()), None).unwrap();
        let err = provider.generate("hi").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyResponse { .. }));
    }
}
