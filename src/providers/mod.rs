//! Provider module for PopAsk
//!
//! This module contains the chat endpoint abstraction and its HTTP
//! implementation.

pub mod base;
pub mod http;

pub use base::{normalize_payload, ChatProvider, ChatResponse, ChatTurn, SUCCESS_CODE};
pub use http::HttpChatProvider;

use crate::config::EndpointConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the chat provider for the configured endpoints
///
/// # Arguments
///
/// * `config` - Endpoint configuration
///
/// # Returns
///
/// Returns a shared provider instance
///
/// # Errors
///
/// Returns error if provider initialization fails
pub fn create_provider(config: &EndpointConfig) -> Result<Arc<dyn ChatProvider>> {
    Ok(Arc::new(HttpChatProvider::new(config.clone())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_with_defaults() {
        assert!(create_provider(&EndpointConfig::default()).is_ok());
    }
}
