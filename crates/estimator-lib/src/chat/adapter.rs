//! Provider selection and the never-failing `generate` contract

use super::{ChatConfig, ChatProvider, ClaudeProvider, GeminiProvider, ProviderKind};
use crate::error::ChatError;
use crate::models::ChatReply;
use crate::observability::{ServiceMetrics, StructuredLogger};

/// Text returned when no provider could be initialized
pub const UNAVAILABLE_TEXT: &str = "Chat service is unavailable";

/// Prefix for replies produced from a provider failure
pub const PROVIDER_ERROR_PREFIX: &str = "Chat provider error";

enum Backend {
    Provider(Box<dyn ChatProvider>),
    /// Every init attempt failed; one diagnostic per attempt
    Unavailable { reasons: Vec<String> },
}

/// Chat front door: one backend chosen at construction, fixed for its lifetime
pub struct ChatAdapter {
    backend: Backend,
    logger: StructuredLogger,
    metrics: ServiceMetrics,
}

impl ChatAdapter {
    /// Try the configured provider, then the other one, then give up.
    ///
    /// The model override only applies to the configured provider; a
    /// fallback runs on its own default model.
    pub fn from_config(config: &ChatConfig, logger: StructuredLogger) -> Self {
        let mut reasons = Vec::new();

        let primary = match config.provider.parse::<ProviderKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                logger.log_chat_provider_failed(&config.provider, "init", &e.to_string());
                reasons.push(e.to_string());
                None
            }
        };

        let mut attempts = Vec::with_capacity(2);
        match primary {
            Some(kind) => {
                attempts.push((kind, config.model_name.as_deref()));
                attempts.push((kind.fallback(), None));
            }
            None => {
                attempts.push((ProviderKind::Gemini, None));
                attempts.push((ProviderKind::Claude, None));
            }
        }

        for (kind, model) in attempts {
            match init_provider(kind, config, model) {
                Ok(provider) => {
                    logger.log_chat_provider_selected(provider.name(), provider.model());
                    return Self::with_backend(Backend::Provider(provider), logger);
                }
                Err(e) => {
                    logger.log_chat_provider_failed(kind.id(), "init", &e.to_string());
                    reasons.push(e.to_string());
                }
            }
        }

        Self::with_backend(Backend::Unavailable { reasons }, logger)
    }

    /// Wrap an already-built provider
    pub fn with_provider(provider: Box<dyn ChatProvider>, logger: StructuredLogger) -> Self {
        Self::with_backend(Backend::Provider(provider), logger)
    }

    pub fn unavailable(reasons: Vec<String>, logger: StructuredLogger) -> Self {
        Self::with_backend(Backend::Unavailable { reasons }, logger)
    }

    fn with_backend(backend: Backend, logger: StructuredLogger) -> Self {
        Self {
            backend,
            logger,
            metrics: ServiceMetrics::new(),
        }
    }

    /// Name of the active provider, `None` when unavailable
    pub fn provider_name(&self) -> Option<&'static str> {
        match &self.backend {
            Backend::Provider(p) => Some(p.name()),
            Backend::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.backend, Backend::Provider(_))
    }

    /// Init diagnostics kept when no provider could be set up
    pub fn diagnostics(&self) -> &[String] {
        match &self.backend {
            Backend::Provider(_) => &[],
            Backend::Unavailable { reasons } => reasons,
        }
    }

    /// Generate a reply; failures come back as reply text, never as errors
    pub async fn generate(&self, prompt: &str) -> ChatReply {
        self.metrics.inc_chat_requests();

        let provider = match &self.backend {
            Backend::Provider(p) => p,
            Backend::Unavailable { .. } => {
                self.metrics.inc_chat_errors();
                return ChatReply::new(UNAVAILABLE_TEXT);
            }
        };

        match provider.generate(prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                self.metrics.inc_chat_errors();
                self.logger
                    .log_chat_provider_failed(provider.name(), "generate", &e.to_string());
                ChatReply::new(format!("{}: {}", PROVIDER_ERROR_PREFIX, e))
            }
        }
    }
}

fn init_provider(
    kind: ProviderKind,
    config: &ChatConfig,
    model: Option<&str>,
) -> Result<Box<dyn ChatProvider>, ChatError> {
    Ok(match kind {
        ProviderKind::Gemini => Box::new(GeminiProvider::from_config(config, model)?),
        ProviderKind::Claude => Box::new(ClaudeProvider::from_config(config, model)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn logger() -> StructuredLogger {
        StructuredLogger::new("test")
    }

    fn gemini_ok_body() -> &'static str {
        r#"{"candidates":[{"content":{"parts":[{"text":"Gemini says hi"}]}}]}"#
    }

    #[tokio::test]
    async fn test_primary_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(gemini_ok_body())
            .create_async()
            .await;

        let adapter = ChatAdapter::from_config(
            &ChatConfig {
                gemini_api_key: Some("g".to_string()),
                gemini_base_url: server.url(),
                ..ChatConfig::default()
            },
            logger(),
        );
        assert_eq!(adapter.provider_name(), Some("gemini"));
        assert_eq!(adapter.generate("hello").await.text, "Gemini says hi");
    }

    #[tokio::test]
    async fn test_primary_failure_becomes_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"error":{"message":"backend exploded"}}"#)
            .create_async()
            .await;

        let adapter = ChatAdapter::from_config(
            &ChatConfig {
                gemini_api_key: Some("g".to_string()),
                gemini_base_url: server.url(),
                ..ChatConfig::default()
            },
            logger(),
        );
        let reply = adapter.generate("hello").await;
        assert!(reply.text.starts_with(PROVIDER_ERROR_PREFIX));
        assert!(reply.text.contains("backend exploded"));
    }

    #[tokio::test]
    async fn test_secondary_success_when_primary_has_no_key() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"Claude says hi"}]}"#)
            .create_async()
            .await;

        let adapter = ChatAdapter::from_config(
            &ChatConfig {
                provider: "gemini".to_string(),
                model_name: Some("gemini-pro".to_string()),
                anthropic_api_key: Some("a".to_string()),
                anthropic_base_url: server.url(),
                ..ChatConfig::default()
            },
            logger(),
        );
        assert_eq!(adapter.provider_name(), Some("claude"));
        assert_eq!(adapter.generate("hello").await.text, "Claude says hi");
    }

    #[tokio::test]
    async fn test_no_provider_available() {
        let adapter = ChatAdapter::from_config(&ChatConfig::default(), logger());
        assert!(!adapter.is_available());
        assert_eq!(adapter.diagnostics().len(), 2);

        for prompt in ["hello", ""] {
            let reply = adapter.generate(prompt).await;
            assert_eq!(reply.text, UNAVAILABLE_TEXT);
        }
    }

    #[tokio::test]
    async fn test_unknown_provider_still_tries_known_ones() {
        let adapter = ChatAdapter::from_config(
            &ChatConfig {
                provider: "openai".to_string(),
                anthropic_api_key: Some("a".to_string()),
                ..ChatConfig::default()
            },
            logger(),
        );
        assert_eq!(adapter.provider_name(), Some("claude"));
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_text() {
        let adapter = ChatAdapter::from_config(
            &ChatConfig {
                provider: "claude".to_string(),
                anthropic_api_key: Some("a".to_string()),
                anthropic_base_url: "http://127.0.0.1:9".to_string(),
                ..ChatConfig::default()
            },
            logger(),
        );
        let reply = adapter.generate("").await;
        assert!(reply.text.starts_with(PROVIDER_ERROR_PREFIX));
    }

    #[tokio::test]
    async fn test_gemini_timeout_reply_keeps_key_private() {
        let adapter = ChatAdapter::from_config(
            &ChatConfig {
                gemini_api_key: Some("SECRET-GEMINI-KEY-123".to_string()),
                gemini_base_url: "http://127.0.0.1:9".to_string(),
                ..ChatConfig::default()
            },
            logger(),
        );
        let reply = adapter.generate("hi").await;
        assert!(reply.text.starts_with(PROVIDER_ERROR_PREFIX));
        assert!(!reply.text.contains("SECRET-GEMINI-KEY-123"), "{}", reply.text);
    }
}
