#![allow(dead_code)]

use actix_web::{App, test as actix_test, web};
use llm_gateway::config::{API_BASE_VAR, API_KEY_VAR, ConfigSource};
use llm_gateway::gateway_state::GatewayState;
use llm_gateway::server::{DEFAULT_MAX_PAYLOAD_SIZE, configure};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "sk-test";

/// Environment pointing the gateway at `upstream`, plus any extra variables.
pub fn upstream_env(upstream: &MockServer, extra: &[(&str, &str)]) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert(API_KEY_VAR.to_string(), TEST_API_KEY.to_string());
    vars.insert(API_BASE_VAR.to_string(), upstream.uri());
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    vars
}

pub async fn create_app(
    vars: HashMap<String, String>,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    create_app_with_limit(vars, DEFAULT_MAX_PAYLOAD_SIZE).await
}

pub async fn create_app_with_limit(
    vars: HashMap<String, String>,
    max_payload_size: usize,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    let source: Arc<dyn ConfigSource> = Arc::new(vars);
    let state = GatewayState::with_http_backend(source).unwrap();
    actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure(max_payload_size)),
    )
    .await
}
