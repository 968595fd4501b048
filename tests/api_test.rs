mod common;

use axum::body::Body;
use axum::http::{ Request, StatusCode };
use common::{ app_state, StubGenerator, StubMode };
use http_body_util::BodyExt;
use serde_json::{ json, Value };
use std::time::Duration;
use tinychat::config::prompt::{ PromptConfig, ASSISTANT_MARKER };
use tinychat::server::create_router;
use tower::ServiceExt;

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn read_json(resp: axum::response::Response) -> Value {
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn is_two_decimal(t: f64) -> bool {
    ((t * 100.0).round() - t * 100.0).abs() < 1e-9
}

// -- Health endpoint --

#[tokio::test]
async fn home_reports_running() {
    let app = create_router(app_state(StubGenerator::new(StubMode::Echo)));
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await, json!({ "message": "TinyLlama backend is running." }));
}

// -- Empty input --

#[tokio::test]
async fn blank_input_skips_generation() {
    let stub = StubGenerator::new(StubMode::Echo);
    for input in ["", "   ", "\n\t  "] {
        let app = create_router(app_state(stub.clone()));
        let resp = app.oneshot(chat_request(json!({ "user_input": input }))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = read_json(resp).await;
        assert_eq!(json["response"], "No input provided.");
        assert_eq!(json["time"].as_f64(), Some(0.0));
    }
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn missing_user_input_counts_as_empty() {
    let stub = StubGenerator::new(StubMode::Echo);
    let app = create_router(app_state(stub.clone()));
    let resp = app.oneshot(chat_request(json!({}))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["response"], "No input provided.");
    assert_eq!(stub.calls(), 0);
}

// -- Generation --

#[tokio::test]
async fn who_are_you_scenario() {
    let stub = StubGenerator::new(StubMode::Echo);
    let app = create_router(app_state(stub.clone()));
    let resp = app.oneshot(chat_request(json!({ "user_input": "Who are you?" }))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = read_json(resp).await;
    assert_eq!(json["response"], "Reply #1");
    let time = json["time"].as_f64().unwrap();
    assert!(time >= 0.0);
    assert!(is_two_decimal(time));

    let prompts = stub.prompts();
    assert_eq!(prompts.len(), 1);
    let expected = format!(
        "{}\n<|user|>\nWho are you?\n<|assistant|>\n",
        PromptConfig::default().preamble()
    );
    assert_eq!(prompts[0], expected);

    let params = stub.params()[0];
    assert_eq!(params.max_new_tokens, 150);
    assert_eq!(params.temperature, 0.0);
    assert_eq!(params.top_p, 0.9);
    assert_eq!(params.repetition_penalty, 1.2);
    assert!(params.pad_with_eos);
}

#[tokio::test]
async fn input_is_trimmed_before_templating() {
    let stub = StubGenerator::new(StubMode::Echo);
    let app = create_router(app_state(stub.clone()));
    app.oneshot(chat_request(json!({ "user_input": "  hello  " }))).await.unwrap();
    assert!(stub.prompts()[0].ends_with("\n<|user|>\nhello\n<|assistant|>\n"));
}

#[tokio::test]
async fn reply_never_contains_assistant_marker() {
    for decoded in [
        "<|assistant|> first <|assistant|> second ",
        "<|assistant|>",
        "no marker at all",
    ] {
        let stub = StubGenerator::new(StubMode::Fixed(decoded.to_string()));
        let app = create_router(app_state(stub));
        let resp = app.oneshot(chat_request(json!({ "user_input": "hi" }))).await.unwrap();
        let json = read_json(resp).await;
        let reply = json["response"].as_str().unwrap();
        assert!(!reply.contains(ASSISTANT_MARKER), "{decoded}");
        assert_eq!(reply, reply.trim());
    }
}

#[tokio::test]
async fn elapsed_time_covers_generation() {
    let stub = StubGenerator::slow(StubMode::Echo, Duration::from_millis(30));
    let app = create_router(app_state(stub));
    let resp = app.oneshot(chat_request(json!({ "user_input": "slow one" }))).await.unwrap();
    let time = read_json(resp).await["time"].as_f64().unwrap();
    assert!(time >= 0.03, "time was {time}");
    assert!(is_two_decimal(time));
}

// -- Failures --

#[tokio::test]
async fn generation_failure_is_500_with_error_text() {
    let stub = StubGenerator::new(StubMode::Fail("CUDA out of memory".into()));
    let app = create_router(app_state(stub.clone()));
    let resp = app.oneshot(chat_request(json!({ "user_input": "hi" }))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = read_json(resp).await;
    let text = json["response"].as_str().unwrap();
    assert!(text.starts_with("Error: "), "{text}");
    assert!(text.contains("CUDA out of memory"));
    assert!(json.get("time").is_none());
}

#[tokio::test]
async fn service_keeps_serving_after_failure() {
    let stub = StubGenerator::new(StubMode::Fail("boom".into()));
    let app = create_router(app_state(stub.clone()));

    let first = app.clone().oneshot(chat_request(json!({ "user_input": "a" }))).await.unwrap();
    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let second = app.oneshot(chat_request(json!({ "user_input": "b" }))).await.unwrap();
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(stub.calls(), 2);
}
