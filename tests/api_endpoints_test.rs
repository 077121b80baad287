mod common;

use actix_web::{http::StatusCode, test as actix_test};
use common::{TEST_API_KEY, create_app, create_app_with_limit, upstream_env};
use llm_gateway::config::{API_BASE_VAR, API_KEY_VAR, JSON_MODE_VAR, MODEL_VAR, TIMEOUT_VAR};
use llm_gateway::error::{
    PAYLOAD_TOO_LARGE_MESSAGE, UPSTREAM_FAILURE_MESSAGE, UPSTREAM_UNAVAILABLE_MESSAGE,
};
use llm_gateway::io_struct::{DEFAULT_SYSTEM_PROMPT, INVALID_JSON_MESSAGE};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-123456789",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn generate_request(payload: Value) -> actix_http::Request {
    actix_test::TestRequest::post()
        .uri("/generate")
        .set_json(&payload)
        .to_request()
}

#[cfg(test)]
mod generate_tests {
    use super::*;

    #[actix_web::test]
    async fn test_generate_end_to_end() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", format!("Bearer {}", TEST_API_KEY).as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": [{"message": {"content": "4"}}]})),
            )
            .expect(1)
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[])).await;
        let resp =
            actix_test::call_service(&app, generate_request(json!({"user_prompt": "2+2?"}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body, json!({"response": "4"}));
    }

    #[actix_web::test]
    async fn test_default_system_prompt_is_sent() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": DEFAULT_SYSTEM_PROMPT},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("hi there")))
            .expect(2)
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[(MODEL_VAR, "gpt-4o-mini")])).await;
        for payload in [
            json!({"user_prompt": "hello"}),
            json!({"user_prompt": "hello", "system_prompt": ""}),
        ] {
            let resp = actix_test::call_service(&app, generate_request(payload)).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: Value = actix_test::read_body_json(resp).await;
            assert_eq!(body["response"], "hi there");
        }
    }

    #[actix_web::test]
    async fn test_missing_user_prompt_is_bad_request() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("x")))
            .expect(0)
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[])).await;
        for payload in [
            json!({"system_prompt": "Be brief"}),
            json!({"user_prompt": ""}),
            json!({}),
        ] {
            let resp = actix_test::call_service(&app, generate_request(payload)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = actix_test::read_body_json(resp).await;
            assert!(body["error"].is_string());
        }
    }

    #[actix_web::test]
    async fn test_malformed_json_is_bad_request() {
        let upstream = MockServer::start().await;
        let app = create_app(upstream_env(&upstream, &[])).await;

        let req = actix_test::TestRequest::post()
            .uri("/generate")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"user_prompt\": ")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], INVALID_JSON_MESSAGE);
    }

    #[actix_web::test]
    async fn test_long_prompt_is_accepted() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("summary")))
            .expect(1)
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[])).await;
        let prompt = "a".repeat(300_000);
        let resp =
            actix_test::call_service(&app, generate_request(json!({"user_prompt": prompt}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body, json!({"response": "summary"}));
    }

    #[actix_web::test]
    async fn test_body_over_limit_is_json_error() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("x")))
            .expect(0)
            .mount(&upstream)
            .await;

        let app = create_app_with_limit(upstream_env(&upstream, &[]), 1024).await;
        let prompt = "a".repeat(4096);
        let resp =
            actix_test::call_service(&app, generate_request(json!({"user_prompt": prompt}))).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": PAYLOAD_TOO_LARGE_MESSAGE}));
    }

    #[actix_web::test]
    async fn test_upstream_429_is_bad_gateway_without_retry() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"error": "rate limit exceeded"})),
            )
            .expect(1)
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[])).await;
        let resp =
            actix_test::call_service(&app, generate_request(json!({"user_prompt": "hi"}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": UPSTREAM_FAILURE_MESSAGE}));
    }

    #[actix_web::test]
    async fn test_upstream_timeout_is_bad_gateway() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("late"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[(TIMEOUT_VAR, "0.2")])).await;
        let resp =
            actix_test::call_service(&app, generate_request(json!({"user_prompt": "hi"}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_json_mode_returns_parsed_object() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"sum": 4}"#)))
            .expect(1)
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[(JSON_MODE_VAR, "true")])).await;
        let resp =
            actix_test::call_service(&app, generate_request(json!({"user_prompt": "2+2?"}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body, json!({"response": {"sum": 4}}));
    }

    #[actix_web::test]
    async fn test_base_url_already_ending_in_v1() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .expect(1)
            .mount(&upstream)
            .await;

        let base = format!("{}/v1/", upstream.uri());
        let app = create_app(upstream_env(&upstream, &[(API_BASE_VAR, base.as_str())])).await;
        let resp =
            actix_test::call_service(&app, generate_request(json!({"user_prompt": "hi"}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

#[cfg(test)]
mod model_listing_tests {
    use super::*;

    fn list_request() -> actix_http::Request {
        actix_test::TestRequest::get().uri("/").to_request()
    }

    #[actix_web::test]
    async fn test_list_models() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("authorization", format!("Bearer {}", TEST_API_KEY).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {"id": "claude-3-haiku-20240307", "object": "model", "owned_by": "anthropic"},
                    {"id": "gpt-4o-mini", "object": "model", "owned_by": "openai"}
                ]
            })))
            .expect(1)
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[])).await;
        let resp = actix_test::call_service(&app, list_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(resp).await;
        let models = body.as_array().unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[1]["id"], "gpt-4o-mini");
    }

    #[actix_web::test]
    async fn test_upstream_status_passed_through() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"error": "rate limit exceeded"})),
            )
            .expect(1)
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[])).await;
        let resp = actix_test::call_service(&app, list_request()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["details"], json!({"error": "rate limit exceeded"}));
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn test_non_json_upstream_body_kept_as_text() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[])).await;
        let resp = actix_test::call_service(&app, list_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["details"], "unauthorized");
    }

    #[actix_web::test]
    async fn test_upstream_timeout_is_unavailable() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&upstream)
            .await;

        let app = create_app(upstream_env(&upstream, &[(TIMEOUT_VAR, "0.2")])).await;
        let resp = actix_test::call_service(&app, list_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], UPSTREAM_UNAVAILABLE_MESSAGE);
    }
}

#[cfg(test)]
mod configuration_tests {
    use super::*;

    #[actix_web::test]
    async fn test_missing_api_key_fails_every_route_before_upstream() {
        let upstream = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let mut vars = upstream_env(&upstream, &[]);
        vars.remove(API_KEY_VAR);
        let app = create_app(vars).await;

        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = actix_test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains(API_KEY_VAR));

        let resp =
            actix_test::call_service(&app, generate_request(json!({"user_prompt": "hi"}))).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_missing_api_base_is_server_error() {
        let vars: HashMap<String, String> =
            HashMap::from([(API_KEY_VAR.to_string(), TEST_API_KEY.to_string())]);
        let app = create_app(vars).await;

        let resp =
            actix_test::call_service(&app, generate_request(json!({"user_prompt": "hi"}))).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = actix_test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains(API_BASE_VAR));
    }

    #[actix_web::test]
    async fn test_health_needs_no_configuration() {
        let app = create_app(HashMap::new()).await;
        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/health").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, "Ok");
    }
}
