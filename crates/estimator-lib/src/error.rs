//! Error types for the estimator
//!
//! `EstimatorError` covers the prediction pipeline (dataset, training,
//! artifacts, request validation). `ChatError` covers chat provider
//! initialization and upstream calls; the chat adapter converts it into
//! reply text instead of propagating it.

use thiserror::Error;

/// Errors raised by the prediction pipeline
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// Unusable configuration or dataset schema (e.g. no `BodyFat` column)
    #[error("configuration error: {0}")]
    Config(String),

    /// Dataset missing, unreadable, or empty after filtering
    #[error("data error: {0}")]
    Data(String),

    /// A request field could not be coerced to a number
    #[error("invalid input: {0}")]
    Validation(String),

    /// Persisted artifact is corrupt or does not match the others
    #[error("artifact error: {0}")]
    Artifact(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EstimatorError {
    /// Returns true if the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, EstimatorError::Validation(_))
    }
}

/// Errors raised by chat providers
#[derive(Debug, Error)]
pub enum ChatError {
    /// Provider could not be initialized (missing key, unknown id, bad client)
    #[error("{provider} is not configured: {reason}")]
    NotConfigured { provider: String, reason: String },

    /// Transport failure or timeout talking to the provider; the request URL
    /// is stripped so it never reaches reply text
    #[error("request to chat provider failed: {0}")]
    Http(reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Provider answered successfully but without any text
    #[error("{provider} returned no text")]
    EmptyResponse { provider: &'static str },

    /// Provider payload could not be parsed
    #[error("failed to decode chat provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        ChatError::Http(e.without_url())
    }
}

impl ChatError {
    pub fn not_configured(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        ChatError::NotConfigured {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = EstimatorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_client_error() {
        assert!(EstimatorError::Validation("Age".into()).is_client_error());
        assert!(!EstimatorError::Data("empty".into()).is_client_error());
        assert!(!EstimatorError::Config("BodyFat".into()).is_client_error());
    }

    #[test]
    fn test_not_configured_message() {
        let err = ChatError::not_configured("gemini", "GEMINI_API_KEY not set");
        assert_eq!(err.to_string(), "gemini is not configured: GEMINI_API_KEY not set");
    }
}
