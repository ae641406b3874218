//! Google Gemini backend (`generateContent` REST API)

use super::{http_client, require_key, ChatConfig, ChatProvider, ProviderKind};
use crate::error::ChatError;
use crate::models::ChatReply;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash";

const PROVIDER: &str = "gemini";

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

/// Gemini chat backend
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    /// Initialize from config; fails without an API key
    pub fn from_config(config: &ChatConfig, model: Option<&str>) -> Result<Self, ChatError> {
        let api_key = require_key(ProviderKind::Gemini, config.gemini_api_key.as_deref())?;
        Ok(Self {
            api_key,
            client: http_client(ProviderKind::Gemini, config.timeout)?,
            model: model.unwrap_or(GEMINI_DEFAULT_MODEL).to_string(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The key travels in the `x-goog-api-key` header, never in the URL
    fn build_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Concatenate the text parts of the first candidate
    fn extract_text(response: GeminiResponse) -> Result<String, ChatError> {
        let text: String = response
            .candidates
            .into_iter()
            .flatten()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ChatError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text)
    }

    fn map_api_error(status: u16, body: &str) -> ChatError {
        let message = serde_json::from_str::<GeminiResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.to_string(), |e| e.message);
        ChatError::Api {
            provider: PROVIDER,
            status,
            message,
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<ChatReply, ChatError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, "Sending request to Gemini API");
        let response = self
            .client
            .post(self.build_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "Gemini API error");
            return Err(Self::map_api_error(status.as_u16(), &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)?;
        if let Some(err) = parsed.error {
            return Err(ChatError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                message: err.message,
            });
        }

        Ok(ChatReply::new(Self::extract_text(parsed)?))
    }
}
