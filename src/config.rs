use std::collections::HashMap;
use std::time::Duration;

pub const API_KEY_VAR: &str = "LITELLM_API_KEY";
pub const API_BASE_VAR: &str = "LITELLM_API_BASE";
pub const MODEL_VAR: &str = "LITELLM_MODEL";
pub const TIMEOUT_VAR: &str = "LITELLM_TIMEOUT";
pub const JSON_MODE_VAR: &str = "LITELLM_JSON_MODE";

pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_TIMEOUT_SECS: f64 = 60.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("The {var} environment variable is not set")]
    MissingRequired { var: &'static str },

    #[error("Invalid value for {var}: {value} - {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where upstream settings come from. Read on every request.
pub trait ConfigSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub model_name: String,
    pub timeout: Duration,
    pub json_mode: bool,
}

impl GatewayConfig {
    pub fn load(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let api_key = non_empty(source, API_KEY_VAR).ok_or(ConfigError::MissingRequired {
            var: API_KEY_VAR,
        })?;
        let api_base = non_empty(source, API_BASE_VAR).map(|base| normalize_api_base(&base));
        let model_name =
            non_empty(source, MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout = match non_empty(source, TIMEOUT_VAR) {
            Some(raw) => parse_timeout(&raw)?,
            None => Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
        };
        let json_mode = match non_empty(source, JSON_MODE_VAR) {
            Some(raw) => parse_flag(&raw)?,
            None => false,
        };
        Ok(Self {
            api_key,
            api_base,
            model_name,
            timeout,
            json_mode,
        })
    }

    /// The normalized base URL, or an error when the deployment did not set one.
    pub fn require_api_base(&self) -> Result<&str, ConfigError> {
        self.api_base.as_deref().ok_or(ConfigError::MissingRequired {
            var: API_BASE_VAR,
        })
    }
}

/// Ensures the base URL ends with exactly one `/v1` segment.
pub fn normalize_api_base(api_base: &str) -> String {
    let trimmed = api_base.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{}/v1", trimmed)
    }
}

fn non_empty(source: &dyn ConfigSource, key: &str) -> Option<String> {
    source
        .var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        var: TIMEOUT_VAR,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let secs: f64 = raw
        .parse()
        .map_err(|_| invalid("expected a number of seconds"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid("must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid("out of range"))
}

fn parse_flag(raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: JSON_MODE_VAR,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
