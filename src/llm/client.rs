// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Client for OpenAI-compatible chat completion endpoints

use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::{prompts, ChatBackend, ChatMessage, ChatRequest, ChatResponse};
use crate::config::{AppConfig, EndpointConfig};
use crate::{PdfScopeError, Result};

/// Chat completion client bound to one provider
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    provider: String,
}

/// Outcome of a connection probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    NotConfigured,
    Connected,
    Failed(String),
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "Not configured"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed(reason) => write!(f, "Failed: {}", reason),
        }
    }
}

impl ChatClient {
    /// Create a client for `endpoint`
    pub fn new(provider: &str, endpoint: &EndpointConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = endpoint.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| PdfScopeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        // Normalize URL
        let base_url = endpoint
            .url
            .trim_end_matches('/')
            .trim_end_matches("/chat/completions")
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: endpoint.api_key.trim().to_string(),
            provider: provider.to_string(),
        })
    }

    /// Text completions (analysis and answering)
    pub fn groq(config: &AppConfig) -> Result<Self> {
        Self::new("Groq", &config.providers.groq)
    }

    /// Vision completions
    pub fn openrouter(config: &AppConfig) -> Result<Self> {
        Self::new("OpenRouter", &config.providers.openrouter)
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a tiny completion to check credentials and reachability
    pub async fn probe(&self, model: &str) -> ProviderStatus {
        if !self.is_configured() {
            return ProviderStatus::NotConfigured;
        }

        let request = ChatRequest::new(model, vec![ChatMessage::user(prompts::PROBE_PROMPT)], 10);
        match self.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => ProviderStatus::Connected,
            Ok(_) => ProviderStatus::Failed("empty response".to_string()),
            Err(e) => ProviderStatus::Failed(e.to_string()),
        }
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        if !self.is_configured() {
            return Err(PdfScopeError::MissingApiKey(self.provider.clone()));
        }

        let url = format!("{}/chat/completions", self.base_url);
        debug!("Sending request to {}: model={}", self.provider, request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PdfScopeError::ApiStatus {
                provider: self.provider.clone(),
                status: response.status().as_u16(),
            });
        }

        let body: ChatResponse = response.json().await?;
        body.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(url: &str, key: &str) -> EndpointConfig {
        EndpointConfig {
            url: url.to_string(),
            api_key: key.to_string(),
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn test_url_normalization() {
        let client = ChatClient::new("Groq", &endpoint("https://api.groq.com/openai/v1/", "k")).unwrap();
        assert_eq!(client.base_url(), "https://api.groq.com/openai/v1");

        let client = ChatClient::new(
            "OpenRouter",
            &endpoint("https://openrouter.ai/api/v1/chat/completions", "k"),
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_missing_key_fails_without_network() {
        let client = ChatClient::new("OpenRouter", &endpoint("http://127.0.0.1:9", "  ")).unwrap();
        assert!(!client.is_configured());

        let request = ChatRequest::new("m", vec![ChatMessage::user("hi")], 10);
        let err = tokio_test::block_on(client.complete(&request)).unwrap_err();
        assert!(matches!(err, PdfScopeError::MissingApiKey(p) if p == "OpenRouter"));

        assert_eq!(tokio_test::block_on(client.probe("m")), ProviderStatus::NotConfigured);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_failure() {
        let client = ChatClient::new("Groq", &endpoint("http://127.0.0.1:9", "key")).unwrap();
        let status = client.probe("llama-3.1-8b-instant").await;
        assert!(matches!(status, ProviderStatus::Failed(_)));
        assert!(status.to_string().starts_with("Failed: "));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ProviderStatus::NotConfigured.to_string(), "Not configured");
        assert_eq!(ProviderStatus::Connected.to_string(), "Connected");
    }
}
