//! HTTP chat provider
//!
//! Without a user API key the transcript goes to the PopAsk proxy function
//! (`{server_url}/pop-ask`), which already answers with the
//! `{code, data, message}` envelope. With a key the request goes straight
//! to an OpenAI-compatible `/v1/chat/completions` endpoint and the first
//! choice is wrapped into an envelope.

use crate::config::EndpointConfig;
use crate::error::{PopAskError, Result};
use crate::providers::{ChatProvider, ChatResponse, ChatTurn};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat provider backed by `reqwest`
///
/// # Examples
///
/// ```no_run
/// use popask::config::EndpointConfig;
/// use popask::providers::{ChatProvider, ChatTurn, HttpChatProvider};
///
/// # async fn example() -> popask::error::Result<()> {
/// let provider = HttpChatProvider::new(EndpointConfig::default())?;
/// let reply = provider.send(&[ChatTurn::user("Hello!")], None).await?;
/// println!("{}", reply.code);
/// # Ok(())
/// # }
/// ```
pub struct HttpChatProvider {
    client: Client,
    config: EndpointConfig,
}

/// Request body of the proxy function
#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    messages: &'a [ChatTurn],
}

/// Request body of the OpenAI-compatible endpoint
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpChatProvider {
    /// Create a provider for the configured endpoints
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: EndpointConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("popask/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PopAskError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized HTTP chat provider: server={}, openai_base={}, model={}",
            config.server_url,
            config.openai_base,
            config.model
        );

        Ok(Self { client, config })
    }

    fn proxy_url(&self) -> String {
        format!("{}/pop-ask", self.config.server_url.trim_end_matches('/'))
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.openai_base.trim_end_matches('/')
        )
    }

    async fn send_via_proxy(&self, transcript: &[ChatTurn]) -> Result<ChatResponse> {
        let url = self.proxy_url();
        tracing::debug!("Sending {} turns to {}", transcript.len(), url);

        let mut request = self.client.post(&url).json(&ProxyRequest {
            messages: transcript,
        });
        if let Some(key) = self.config.anon_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Chat request failed: {}", e);
            PopAskError::Provider(format!("Chat request failed: {}", e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(PopAskError::Http)?;

        match serde_json::from_str::<ChatResponse>(&body) {
            Ok(envelope) => {
                tracing::debug!("Proxy answered with code {}", envelope.code);
                Ok(envelope)
            }
            Err(_) if !status.is_success() => {
                tracing::error!("Proxy returned error {}: {}", status, body);
                Err(PopAskError::Provider(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    body
                ))
                .into())
            }
            Err(e) => Err(PopAskError::Provider(format!("Unreadable response: {}", e)).into()),
        }
    }

    async fn send_direct(&self, transcript: &[ChatTurn], api_key: &str) -> Result<ChatResponse> {
        let url = self.completions_url();
        tracing::debug!(
            "Sending {} turns to {} with model {}",
            transcript.len(),
            url,
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&CompletionRequest {
                model: &self.config.model,
                messages: transcript,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Completion request failed: {}", e);
                PopAskError::Provider(format!("Completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Completion endpoint returned error {}: {}", status, error_text);
            return Err(PopAskError::Provider(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            ))
            .into());
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            PopAskError::Provider(format!("Failed to parse completion response: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| PopAskError::Provider("empty choices from API".to_string()))?;

        Ok(ChatResponse::ok(content))
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    async fn send(&self, transcript: &[ChatTurn], api_key: Option<&str>) -> Result<ChatResponse> {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => self.send_direct(transcript, key).await,
            None => self.send_via_proxy(transcript).await,
        }
    }
}
