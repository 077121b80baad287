use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful and concise assistant";
pub const JSON_MODE_INSTRUCTION: &str =
    "Respond only with a single valid JSON object and no additional text.";

pub const INVALID_JSON_MESSAGE: &str =
    "Could not process the request body. Make sure it is valid JSON.";
pub const EMPTY_PAYLOAD_MESSAGE: &str = "Invalid or empty JSON payload.";
pub const MISSING_USER_PROMPT_MESSAGE: &str =
    "The 'user_prompt' field is required in the request body.";

/// Client input that failed validation. The message is safe to return to callers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidRequest {
    pub message: String,
}

impl InvalidRequest {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl GenerationRequest {
    /// Validates a raw `/generate` body.
    pub fn from_body(body: &[u8]) -> Result<Self, InvalidRequest> {
        let json: Value = serde_json::from_slice(body).map_err(|e| {
            log::error!("Failed to parse the request JSON: {}", e);
            InvalidRequest::new(INVALID_JSON_MESSAGE)
        })?;
        let fields = match json {
            Value::Object(fields) if !fields.is_empty() => fields,
            other => {
                log::warn!(
                    "Rejected request payload that is not a non-empty object: {}",
                    other
                );
                return Err(InvalidRequest::new(EMPTY_PAYLOAD_MESSAGE));
            }
        };

        let user_prompt = optional_string(fields.get("user_prompt"), "user_prompt")?
            .ok_or_else(|| {
                log::warn!("Rejected request without a 'user_prompt' field");
                InvalidRequest::new(MISSING_USER_PROMPT_MESSAGE)
            })?;
        let system_prompt = optional_string(fields.get("system_prompt"), "system_prompt")?
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        Ok(Self {
            system_prompt,
            user_prompt,
        })
    }
}

/// Null and empty strings count as absent.
fn optional_string(value: Option<&Value>, field: &str) -> Result<Option<String>, InvalidRequest> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => {
            log::warn!("Rejected non-string '{}' field: {}", field, other);
            Err(InvalidRequest::new(format!(
                "The '{}' field must be a string.",
                field
            )))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatCompletionRequest {
    pub fn new(model: &str, req: &GenerationRequest, json_mode: bool) -> Self {
        let (system_prompt, response_format) = if json_mode {
            (
                format!("{}\n\n{}", req.system_prompt, JSON_MODE_INSTRUCTION),
                Some(ResponseFormat {
                    format_type: "json_object".to_string(),
                }),
            )
        } else {
            (req.system_prompt.clone(), None)
        };
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: req.user_prompt.clone(),
                },
            ],
            response_format,
        }
    }
}

/// The subset of an OpenAI chat completion the gateway reads. Missing pieces
/// deserialize to defaults so partial upstream payloads still yield text.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    pub fn first_content(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

/// Unwraps the OpenAI list envelope; anything else passes through unchanged.
pub fn model_descriptors(body: Value) -> Value {
    match body {
        Value::Object(mut fields) if fields.get("data").is_some_and(Value::is_array) => {
            fields.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
