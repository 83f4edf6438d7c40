//! `OpenAiCompatClient` against a mock provider, and the full relay on top of it.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use final_cut_backend::config::{Config, UpstreamConfig};
use final_cut_backend::models::ChatMessage;
use final_cut_backend::server::routes::{build_router, AppState};
use final_cut_backend::upstream::openai::OpenAiCompatClient;
use final_cut_backend::upstream::{CompletionProvider, CompletionRequest, UpstreamError};

fn upstream_config(server: &MockServer) -> UpstreamConfig {
    UpstreamConfig {
        base_url: format!("{}/api/v1", server.uri()),
        api_key: Some("sk-test".to_string()),
        referer: "https://localhost:3000".to_string(),
        title: "Final Cut Game".to_string(),
    }
}

fn completion_body(content: &str) -> Value {
    json!({
        "id": "gen-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
    })
}

fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::from(": OPENROUTER PROCESSING\n\n");
    for fragment in fragments {
        let chunk = json!({"choices": [{"index": 0, "delta": {"content": fragment}}]});
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn request() -> CompletionRequest {
    CompletionRequest::new("openai/gpt-4o-mini", vec![ChatMessage::user("hi")], 100, 0.1)
}

#[tokio::test]
async fn test_complete_sends_provider_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header_eq("authorization", "Bearer sk-test"))
        .and(header_eq("http-referer", "https://localhost:3000"))
        .and(header_eq("x-title", "Final Cut Game"))
        .and(body_partial_json(json!({"model": "openai/gpt-4o-mini", "max_tokens": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("42")))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&upstream_config(&server)).unwrap();
    let text = client.complete(request()).await.unwrap();
    assert_eq!(text, "42");
}

#[tokio::test]
async fn test_complete_surfaces_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&upstream_config(&server)).unwrap();
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 429, ref body } if body == "rate limited"));
}

#[tokio::test]
async fn test_complete_reports_refusal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": null, "refusal": "no"}}]
        })))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&upstream_config(&server)).unwrap();
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Refusal(_)));
}

#[tokio::test]
async fn test_stream_chat_yields_fragments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["Hello", ", ", "world"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&upstream_config(&server)).unwrap();
    let mut rx = client.stream_chat(request()).await.unwrap();

    let mut fragments = Vec::new();
    while let Some(fragment) = rx.recv().await {
        fragments.push(fragment);
    }
    assert_eq!(fragments, vec!["Hello", ", ", "world"]);
}

#[tokio::test]
async fn test_stream_chat_keeps_unterminated_last_frame() {
    let server = MockServer::start().await;
    let body = format!(
        "data: {}\n\ndata: {}",
        json!({"choices": [{"delta": {"content": "Hello"}}]}),
        json!({"choices": [{"delta": {"content": "world"}}]})
    );
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&upstream_config(&server)).unwrap();
    let mut rx = client.stream_chat(request()).await.unwrap();

    let mut fragments = Vec::new();
    while let Some(fragment) = rx.recv().await {
        fragments.push(fragment);
    }
    assert_eq!(fragments, vec!["Hello", "world"]);
}

#[tokio::test]
async fn test_stream_chat_error_status_before_first_byte() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&upstream_config(&server)).unwrap();
    let err = client.stream_chat(request()).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_score_relay_end_to_end_without_structured_support() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"response_format": {"type": "json_schema"}})))
        .respond_with(ResponseTemplate::new(400).set_body_string("response_format not supported"))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "Here you go: {\"score\": 70, \"motive_points\": 20, \"method_points\": 20, \"logic_points\": 30}",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        upstream: upstream_config(&server),
        ..Config::default()
    };
    let provider = Arc::new(OpenAiCompatClient::new(&config.upstream).unwrap());
    let app = build_router(Arc::new(AppState::new(Arc::new(config), provider)));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/score")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "reasoning": "The gardener poisoned the tea for the inheritance.",
                        "solution": {"culprit": "Gardener", "method": "Poison", "motive": "Money"},
                        "is_correct": true
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["score"], 70);
    assert_eq!(body["breakdown"]["logic_points"], 30);
}
