use crate::config::{ConfigSource, GatewayConfig};
use crate::error::GatewayError;
use crate::io_struct::{ChatCompletionRequest, GenerationRequest, model_descriptors};
use crate::upstream::{HttpBackend, LlmBackend, UpstreamEndpoint, UpstreamError};
use serde_json::Value;
use std::sync::Arc;

/// Shared, read-only state behind every route.
#[derive(Clone)]
pub struct GatewayState {
    pub config_source: Arc<dyn ConfigSource>,
    pub backend: Arc<dyn LlmBackend>,
}

impl GatewayState {
    pub fn new(config_source: Arc<dyn ConfigSource>, backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            config_source,
            backend,
        }
    }

    pub fn with_http_backend(config_source: Arc<dyn ConfigSource>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::new(config_source, Arc::new(HttpBackend::new(client))))
    }

    fn load_config(&self) -> Result<GatewayConfig, GatewayError> {
        GatewayConfig::load(self.config_source.as_ref()).map_err(|e| {
            log::error!("Configuration error: {}", e);
            GatewayError::Config(e)
        })
    }

    fn endpoint(config: &GatewayConfig) -> Result<UpstreamEndpoint, GatewayError> {
        let api_base = config.require_api_base().map_err(|e| {
            log::error!("Configuration error: {}", e);
            GatewayError::Config(e)
        })?;
        Ok(UpstreamEndpoint {
            api_base: api_base.to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }

    /// Validates `body`, sends one chat completion upstream and returns the generated text
    /// (or, in JSON mode, the JSON value it contains).
    pub async fn generate(&self, body: &[u8]) -> Result<Value, GatewayError> {
        let config = self.load_config()?;
        let endpoint = Self::endpoint(&config)?;
        let req = GenerationRequest::from_body(body)?;

        let chat = ChatCompletionRequest::new(&config.model_name, &req, config.json_mode);
        log::info!("Sending request to the LLM service ({})", config.model_name);
        let completion = self
            .backend
            .chat_completion(&endpoint, &chat)
            .await
            .map_err(|e| {
                log::error!("Error calling the LLM service: {}", e);
                GatewayError::Upstream(e)
            })?;
        let content = completion.first_content();
        let response = if config.json_mode {
            serde_json::from_str(&content).map_err(|e| {
                let err = UpstreamError::InvalidResponse {
                    url: endpoint.api_path("/chat/completions"),
                    reason: format!("content is not valid JSON: {}", e),
                };
                log::error!("Error calling the LLM service: {}", err);
                GatewayError::Upstream(err)
            })?
        } else {
            Value::String(content)
        };
        log::info!("Response received from the LLM service");
        Ok(response)
    }

    pub async fn list_models(&self) -> Result<Value, GatewayError> {
        let config = self.load_config()?;
        let endpoint = Self::endpoint(&config)?;
        let body = self.backend.list_models(&endpoint).await.map_err(|e| {
            log::error!("Error listing models from the LLM service: {}", e);
            GatewayError::from_model_listing(e)
        })?;
        Ok(model_descriptors(body))
    }
}
