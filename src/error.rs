//! Error types for PopAsk
//!
//! This module defines the error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.
//!
//! Chat lifecycle failures (rejections, failed dispatches, cancellations)
//! are not errors: they are reported through notices and outcome enums.
//! The variants here cover the collaborators underneath them.

use thiserror::Error;

/// Main error type for PopAsk operations
#[derive(Error, Debug)]
pub enum PopAskError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat endpoint errors (bad envelope, empty completion, HTTP status)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Key-value persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// OCR engine errors
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Prompt template rejected (missing label or content, duplicate label)
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for PopAsk operations
///
/// Uses `anyhow::Error` so callers can attach context while the typed
/// variants above stay available through downcasting.
pub type Result<T> = anyhow::Result<T>;
