mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    init_test_logger, noisy_png_bytes, ocr_config, parsed_body, png_base64, png_bytes,
    wrapped_base64,
};
use ocr_gateway::api::{create_router, AppState};
use ocr_gateway::cache::{MemoryBackend, ResultCache};
use ocr_gateway::config::Config;
use ocr_gateway::ocr::OcrProvider;

fn gateway(server: &MockServer, cache: ResultCache, max_image_bytes: usize) -> Router {
    let mut config = Config::default();
    config.ocr = ocr_config(&server.uri(), 2);
    config.preprocessing.max_image_bytes = max_image_bytes;

    let provider = OcrProvider::new(&config.ocr);
    create_router(AppState::new(config, provider, cache))
}

fn memory_cache() -> ResultCache {
    ResultCache::new(Arc::new(MemoryBackend::new(64)))
}

fn ocr_request(image_base64: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/ocr")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "image_base64": image_base64 }).to_string(),
        ))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn mount_text(server: &MockServer, text: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/parse/image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(parsed_body(text)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_hello_then_cached_hello() {
    init_test_logger();
    let server = MockServer::start().await;
    mount_text(&server, "HELLO\r\n", 1).await;

    let app = gateway(&server, memory_cache(), 1024 * 1024);
    let image = png_base64();

    let (status, body) = send(&app, ocr_request(&image)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "text": "HELLO" }));

    let (status, body) = send(&app, ocr_request(&image)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "text": "HELLO", "cached": true }));
}

#[tokio::test]
async fn test_without_cache_each_request_reaches_provider() {
    let server = MockServer::start().await;
    mount_text(&server, "HELLO", 2).await;

    let app = gateway(&server, ResultCache::disabled(), 1024 * 1024);
    let image = png_base64();

    for _ in 0..2 {
        let (status, body) = send(&app, ocr_request(&image)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "text": "HELLO" }));
    }
}

#[tokio::test]
async fn test_provider_outage_is_502_and_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/image"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_text(&server, "HELLO", 1).await;

    let app = gateway(&server, memory_cache(), 1024 * 1024);
    let image = png_base64();

    let (status, body) = send(&app, ocr_request(&image)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("after 2 attempts"));

    let (status, body) = send(&app, ocr_request(&image)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "text": "HELLO" }));
}

#[tokio::test]
async fn test_provider_recovers_on_second_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/image"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_text(&server, "second attempt", 1).await;

    let app = gateway(&server, ResultCache::disabled(), 1024 * 1024);

    let (status, body) = send(&app, ocr_request(&png_base64())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "text": "second attempt" }));
}

#[tokio::test]
async fn test_size_limit_boundary() {
    let server = MockServer::start().await;
    mount_text(&server, "HELLO", 1).await;

    let image = png_bytes();
    let encoded = png_base64();

    let at_limit = gateway(&server, ResultCache::disabled(), image.len());
    let (status, _) = send(&at_limit, ocr_request(&encoded)).await;
    assert_eq!(status, StatusCode::OK);

    let one_under = gateway(&server, ResultCache::disabled(), image.len() - 1);
    let (status, body) = send(&one_under, ocr_request(&encoded)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().unwrap().contains("Image too large"));
}

#[tokio::test]
async fn test_wrapped_base64_at_size_limit_is_accepted() {
    let server = MockServer::start().await;
    mount_text(&server, "HELLO", 1).await;

    let image = noisy_png_bytes(720);
    let wrapped = wrapped_base64(&image);
    let request = ocr_request(&wrapped);

    let mut config = Config::default();
    config.ocr = ocr_config(&server.uri(), 2);
    config.preprocessing.max_image_bytes = image.len();
    config.preprocessing.median_radius = 0;

    // Escaped line breaks alone outgrow the fixed envelope slack here.
    let body_len = json!({ "image_base64": wrapped }).to_string().len();
    assert!(body_len > STANDARD.encode(&image).len() + 64 * 1024);
    assert!(body_len <= config.max_body_bytes());

    let provider = OcrProvider::new(&config.ocr);
    let app = create_router(AppState::new(config, provider, ResultCache::disabled()));

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "text": "HELLO" }));
}

#[tokio::test]
async fn test_bad_input_never_reaches_provider() {
    let server = MockServer::start().await;
    mount_text(&server, "HELLO", 0).await;

    let app = gateway(&server, memory_cache(), 1024 * 1024);

    for image in ["", "%%%", "aGVsbG8gd29ybGQ="] {
        let (status, body) = send(&app, ocr_request(image)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "image_base64: {image:?}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_language_changes_cache_entry() {
    let server = MockServer::start().await;
    mount_text(&server, "HOLA", 2).await;

    let app = gateway(&server, memory_cache(), 1024 * 1024);
    let image = png_base64();

    for language in ["spa", "eng"] {
        let request = Request::builder()
            .method("POST")
            .uri("/ocr")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "image_base64": image, "language": language }).to_string(),
            ))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "text": "HOLA" }));
    }
}
