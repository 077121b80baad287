use crate::config::ConfigError;
use crate::io_struct::InvalidRequest;
use crate::upstream::UpstreamError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{Value, json};

pub const UPSTREAM_FAILURE_MESSAGE: &str =
    "An internal error occurred while communicating with the LLM service.";
pub const UPSTREAM_STATUS_MESSAGE: &str = "The LLM service returned an error.";
pub const UPSTREAM_UNAVAILABLE_MESSAGE: &str = "The LLM service is unavailable.";
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "The request body exceeds the maximum allowed size.";
pub const UNREADABLE_BODY_MESSAGE: &str = "Could not read the request body.";

/// Every failure a handler can return, mapped to its HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    BadRequest(#[from] InvalidRequest),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The body never reached validation, e.g. it exceeded the payload limit.
    #[error("could not read request body: {0}")]
    Payload(actix_web::Error),

    /// Upstream detail stays in the server log.
    #[error("upstream failure: {0}")]
    Upstream(UpstreamError),

    /// Upstream answered with a non-success status that is passed through.
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16, details: Value },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(UpstreamError),
}

impl GatewayError {
    /// Translation used by the model listing route, which exposes upstream status and body.
    pub fn from_model_listing(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status, body, .. } => GatewayError::UpstreamStatus {
                status,
                details: body,
            },
            UpstreamError::Timeout { .. } | UpstreamError::Transport { .. } => {
                GatewayError::UpstreamUnavailable(err)
            }
            UpstreamError::InvalidResponse { .. } => GatewayError::Upstream(err),
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Payload(e) => e.as_response_error().status_code(),
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            GatewayError::BadRequest(e) => json!({ "error": e.message }),
            GatewayError::Config(e) => json!({ "error": e.to_string() }),
            GatewayError::Payload(_) if self.status_code() == StatusCode::PAYLOAD_TOO_LARGE => {
                json!({ "error": PAYLOAD_TOO_LARGE_MESSAGE })
            }
            GatewayError::Payload(_) => json!({ "error": UNREADABLE_BODY_MESSAGE }),
            GatewayError::Upstream(_) => json!({ "error": UPSTREAM_FAILURE_MESSAGE }),
            GatewayError::UpstreamStatus { details, .. } => json!({
                "error": UPSTREAM_STATUS_MESSAGE,
                "details": details,
            }),
            GatewayError::UpstreamUnavailable(_) => {
                json!({ "error": UPSTREAM_UNAVAILABLE_MESSAGE })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
