//! Configuration management for PopAsk
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PopAskError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for PopAsk
///
/// Every section has defaults, so an empty or missing file yields a
/// usable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote chat endpoint settings
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Daily usage quota settings
    #[serde(default)]
    pub usage: UsageConfig,

    /// Prompt library settings
    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Selection capture and OCR settings
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Key-value store settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote chat endpoint configuration
///
/// Requests without a user API key go to the PopAsk proxy at
/// `{server_url}/pop-ask`; requests with a key go straight to
/// `{openai_base}/v1/chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the PopAsk proxy function
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Bearer token sent to the proxy (anonymous project key)
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Base URL of the OpenAI-compatible API used with a user key
    #[serde(default = "default_openai_base")]
    pub openai_base: String,

    /// Model requested from the OpenAI-compatible API
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP client timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_server_url() -> String {
    "http://127.0.0.1:54321/functions/v1".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            anon_key: None,
            openai_base: default_openai_base(),
            model: default_model(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Daily usage quota configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Maximum successful chat requests per calendar day
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Remaining allowance at or below which a low-quota notice is shown
    #[serde(default = "default_low_quota_threshold")]
    pub low_quota_threshold: u32,
}

fn default_daily_limit() -> u32 {
    50
}

fn default_low_quota_threshold() -> u32 {
    2
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            low_quota_threshold: default_low_quota_threshold(),
        }
    }
}

/// Prompt library configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Length of the recently-used prompt list
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    12
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
        }
    }
}

/// Selection capture and OCR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Time after which a pending OCR call is reported as failed (ms)
    #[serde(default = "default_ocr_timeout_ms")]
    pub ocr_timeout_ms: u64,

    /// Delay before focusing the input after a window transition (ms)
    #[serde(default = "default_focus_delay_ms")]
    pub focus_delay_ms: u64,

    /// Path or name of the tesseract executable
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
}

fn default_ocr_timeout_ms() -> u64 {
    10_000
}

fn default_focus_delay_ms() -> u64 {
    100
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            ocr_timeout_ms: default_ocr_timeout_ms(),
            focus_delay_ms: default_focus_delay_ms(),
            tesseract_path: default_tesseract_path(),
        }
    }
}

/// Key-value store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path; the platform data directory is used when unset
    #[serde(default)]
    pub db_path: Option<String>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PopAskError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PopAskError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(server_url) = std::env::var("POPASK_SERVER_URL") {
            self.endpoint.server_url = server_url;
        }

        if let Ok(anon_key) = std::env::var("POPASK_ANON_KEY") {
            self.endpoint.anon_key = Some(anon_key);
        }

        if let Ok(openai_base) = std::env::var("POPASK_OPENAI_BASE") {
            self.endpoint.openai_base = openai_base;
        }

        if let Ok(model) = std::env::var("POPASK_MODEL") {
            self.endpoint.model = model;
        }

        if let Ok(timeout) = std::env::var("POPASK_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.endpoint.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid POPASK_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(limit) = std::env::var("POPASK_DAILY_LIMIT") {
            if let Ok(value) = limit.parse() {
                self.usage.daily_limit = value;
            } else {
                tracing::warn!("Invalid POPASK_DAILY_LIMIT: {}", limit);
            }
        }

        if let Ok(ocr_timeout) = std::env::var("POPASK_OCR_TIMEOUT_MS") {
            if let Ok(value) = ocr_timeout.parse() {
                self.selection.ocr_timeout_ms = value;
            } else {
                tracing::warn!("Invalid POPASK_OCR_TIMEOUT_MS: {}", ocr_timeout);
            }
        }

        if let Ok(tesseract) = std::env::var("POPASK_TESSERACT") {
            self.selection.tesseract_path = tesseract;
        }

        if let Ok(db_path) = std::env::var("POPASK_STORE_DB") {
            self.storage.db_path = Some(db_path);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(store) = &cli.store {
            tracing::debug!("Using store override from CLI: {}", store);
            self.storage.db_path = Some(store.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("endpoint.server_url", &self.endpoint.server_url),
            ("endpoint.openai_base", &self.endpoint.openai_base),
        ] {
            if url.is_empty() {
                return Err(PopAskError::Config(format!("{} cannot be empty", name)).into());
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PopAskError::Config(format!(
                    "{} must be an http(s) URL, got: {}",
                    name, url
                ))
                .into());
            }
        }

        if self.endpoint.model.is_empty() {
            return Err(PopAskError::Config("endpoint.model cannot be empty".to_string()).into());
        }

        if self.endpoint.timeout_seconds == 0 {
            return Err(PopAskError::Config(
                "endpoint.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.usage.daily_limit == 0 {
            return Err(
                PopAskError::Config("usage.daily_limit must be greater than 0".to_string()).into(),
            );
        }

        if self.prompts.recent_limit == 0 {
            return Err(PopAskError::Config(
                "prompts.recent_limit must be greater than 0".to_string(),
            )
            .into());
        }

        if self.selection.ocr_timeout_ms == 0 {
            return Err(PopAskError::Config(
                "selection.ocr_timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
