//! Chat provider abstraction
//!
//! Two interchangeable LLM backends sit behind [`ChatProvider`]. The
//! [`ChatAdapter`] picks one at construction time and turns every failure
//! into reply text, so callers always get a [`ChatReply`].

mod adapter;
mod claude;
mod gemini;

pub use adapter::{ChatAdapter, PROVIDER_ERROR_PREFIX, UNAVAILABLE_TEXT};
pub use claude::{ClaudeProvider, ANTHROPIC_BASE_URL, CLAUDE_DEFAULT_MODEL, CLAUDE_MAX_TOKENS};
pub use gemini::{GeminiProvider, GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL};

use crate::error::ChatError;
use crate::models::ChatReply;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default upstream request timeout
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed assistant framing prepended to every user message
pub const ASSISTANT_CONTEXT: &str = "You are a smart assistant specialised in nutrition and fitness. \
Answer briefly with clear, practical advice.";

/// Wrap a user message with the assistant context
pub fn build_prompt(message: &str) -> String {
    format!("{}\n\nUser question: {}", ASSISTANT_CONTEXT, message)
}

/// A backend that turns a prompt into text
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stable provider id, for logs
    fn name(&self) -> &'static str;

    /// Model the provider sends requests to
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<ChatReply, ChatError>;
}

/// Known provider ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Claude,
}

impl ProviderKind {
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Claude => "claude",
        }
    }

    /// The backend tried when this one cannot be initialized
    pub fn fallback(&self) -> ProviderKind {
        match self {
            ProviderKind::Gemini => ProviderKind::Claude,
            ProviderKind::Claude => ProviderKind::Gemini,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            other => Err(ChatError::not_configured(
                other,
                "unknown chat provider (expected 'gemini' or 'claude')",
            )),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Provider selection and credentials
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Provider id to try first
    pub provider: String,
    /// Model override for the selected provider
    pub model_name: Option<String>,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub timeout: Duration,
    pub gemini_base_url: String,
    pub anthropic_base_url: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini.id().to_string(),
            model_name: None,
            gemini_api_key: None,
            anthropic_api_key: None,
            timeout: DEFAULT_CHAT_TIMEOUT,
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            anthropic_base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }
}

/// Credential for a provider, with blank strings treated as missing
pub(crate) fn require_key(provider: ProviderKind, key: Option<&str>) -> Result<String, ChatError> {
    match key.map(str::trim) {
        Some(k) if !k.is_empty() => Ok(k.to_string()),
        _ => Err(ChatError::not_configured(provider.id(), "no API key configured")),
    }
}

pub(crate) fn http_client(
    provider: ProviderKind,
    timeout: Duration,
) -> Result<reqwest::Client, ChatError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ChatError::not_configured(provider.id(), format!("HTTP client: {}", e)))
}
