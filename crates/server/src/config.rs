//! Server configuration

use anyhow::{bail, Context, Result};
use estimator_lib::chat::{ChatConfig, ANTHROPIC_BASE_URL, GEMINI_BASE_URL};
use estimator_lib::predictor::{OutputConfig, MAX_BODY_FAT, MIN_BODY_FAT};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Optional config file, looked up in the working directory
const CONFIG_FILE: &str = "bodyfat";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// CSV training data, used on a cache miss
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Directory holding the three artifact blobs
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_chat_provider")]
    pub chat_provider: String,

    #[serde(default = "default_chat_model_name")]
    pub chat_model_name: Option<String>,

    #[serde(default = "default_gemini_api_key")]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_anthropic_api_key")]
    pub anthropic_api_key: Option<String>,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,

    #[serde(default = "default_min_body_fat")]
    pub min_body_fat: f64,

    #[serde(default = "default_max_body_fat")]
    pub max_body_fat: f64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "bodyfat-server".to_string())
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("bodyfat.csv")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_chat_provider() -> String {
    std::env::var("CHAT_PROVIDER").unwrap_or_else(|_| "gemini".to_string())
}

fn default_chat_model_name() -> Option<String> {
    std::env::var("CHAT_MODEL_NAME").ok()
}

fn default_gemini_api_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY").ok()
}

fn default_anthropic_api_key() -> Option<String> {
    std::env::var("ANTHROPIC_API_KEY").ok()
}

fn default_gemini_base_url() -> String {
    GEMINI_BASE_URL.to_string()
}

fn default_anthropic_base_url() -> String {
    ANTHROPIC_BASE_URL.to_string()
}

fn default_chat_timeout() -> u64 {
    30
}

fn default_min_body_fat() -> f64 {
    MIN_BODY_FAT
}

fn default_max_body_fat() -> f64 {
    MAX_BODY_FAT
}

impl ServerConfig {
    /// Load from `bodyfat.toml` (if present) and `BODYFAT_*` environment variables
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix("BODYFAT").try_parsing(true));
        Self::from_builder(builder)
    }

    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config: ServerConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.min_body_fat.is_finite()
            && self.max_body_fat.is_finite()
            && self.min_body_fat < self.max_body_fat)
        {
            bail!(
                "min_body_fat ({}) must be below max_body_fat ({})",
                self.min_body_fat,
                self.max_body_fat
            );
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            provider: self.chat_provider.clone(),
            model_name: self.chat_model_name.clone().filter(|m| !m.trim().is_empty()),
            gemini_api_key: self.gemini_api_key.clone(),
            anthropic_api_key: self.anthropic_api_key.clone(),
            timeout: Duration::from_secs(self.chat_timeout_secs),
            gemini_base_url: self.gemini_base_url.clone(),
            anthropic_base_url: self.anthropic_base_url.clone(),
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            min_body_fat: self.min_body_fat,
            max_body_fat: self.max_body_fat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_builder(builder()).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
        assert_eq!(config.dataset_path, PathBuf::from("bodyfat.csv"));
        assert_eq!(config.output_config(), OutputConfig::default());
        assert_eq!(config.chat_config().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_builder(
            builder()
                .set_override("api_port", 8081)
                .unwrap()
                .set_override("chat_provider", "claude")
                .unwrap()
                .set_override("chat_model_name", "")
                .unwrap()
                .set_override("max_body_fat", 45.0)
                .unwrap(),
        )
        .unwrap();

        assert_eq!(config.api_port, 8081);
        let chat = config.chat_config();
        assert_eq!(chat.provider, "claude");
        assert_eq!(chat.model_name, None);
        assert_eq!(config.output_config().max_body_fat, 45.0);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = ServerConfig::from_builder(
            builder()
                .set_override("min_body_fat", 40.0)
                .unwrap()
                .set_override("max_body_fat", 10.0)
                .unwrap(),
        );
        assert!(result.is_err());
    }
}
