//! Client for the OpenAI-compatible service the gateway forwards to.

use crate::io_struct::{ChatCompletionRequest, ChatCompletionResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}: {body}")]
    Status { url: String, status: u16, body: Value },

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

/// Where and how to reach the upstream service for one request.
#[derive(Debug, Clone)]
pub struct UpstreamEndpoint {
    pub api_base: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl UpstreamEndpoint {
    pub fn api_path(&self, api_path: &str) -> String {
        if api_path.starts_with('/') {
            format!("{}{}", self.api_base, api_path)
        } else {
            format!("{}/{}", self.api_base, api_path)
        }
    }
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn chat_completion(
        &self,
        endpoint: &UpstreamEndpoint,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, UpstreamError>;

    async fn list_models(&self, endpoint: &UpstreamEndpoint) -> Result<Value, UpstreamError>;
}

/// `LlmBackend` over HTTP. One attempt per call, no retries.
#[derive(Debug, Clone, Default)]
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        url: String,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, UpstreamError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| transport_error(url.clone(), e))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp
            .text()
            .await
            .map_err(|e| transport_error(url.clone(), e))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Err(UpstreamError::Status {
            url,
            status: status.as_u16(),
            body,
        })
    }
}

fn transport_error(url: String, e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout { url }
    } else {
        UpstreamError::Transport { url, source: e }
    }
}

#[async_trait]
impl LlmBackend for HttpBackend {
    async fn chat_completion(
        &self,
        endpoint: &UpstreamEndpoint,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, UpstreamError> {
        let url = endpoint.api_path("/chat/completions");
        let builder = self
            .client
            .post(&url)
            .bearer_auth(&endpoint.api_key)
            .timeout(endpoint.timeout)
            .json(request);
        let resp = self.send(url.clone(), builder).await?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| transport_error(url.clone(), e))?;
        serde_json::from_slice(&body).map_err(|e| UpstreamError::InvalidResponse {
            url,
            reason: e.to_string(),
        })
    }

    async fn list_models(&self, endpoint: &UpstreamEndpoint) -> Result<Value, UpstreamError> {
        let url = endpoint.api_path("/models");
        let builder = self
            .client
            .get(&url)
            .bearer_auth(&endpoint.api_key)
            .timeout(endpoint.timeout);
        let resp = self.send(url.clone(), builder).await?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| transport_error(url.clone(), e))?;
        serde_json::from_slice(&body).map_err(|e| UpstreamError::InvalidResponse {
            url,
            reason: e.to_string(),
        })
    }
}
