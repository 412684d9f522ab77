//! Raw body capture middleware behaviour.
//!
//! Uses a small router with capture applied the same way the production
//! router applies it, so routes outside the capture set can be observed.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware,
    routing::post,
    Json, Router,
};
use hookline_api::middleware::{capture_raw_body, CaptureConfig, CaptureState, RawBody};
use hookline_core::IngestionStats;
use hookline_testing::{read_body, read_json};
use serde_json::Value;
use tower::ServiceExt;

const LIMIT: usize = 64;

fn app() -> (Router, Arc<IngestionStats>) {
    let stats = Arc::new(IngestionStats::default());
    let capture = CaptureState {
        config: Arc::new(CaptureConfig::from_patterns(&["/webhooks/*"], LIMIT)),
        stats: stats.clone(),
    };

    let router = Router::new()
        .route("/webhooks/raw", post(|raw: RawBody| async move { raw.0 }))
        .route(
            "/webhooks/both",
            post(|raw: RawBody, Json(value): Json<Value>| async move {
                format!("{}|{}", raw.0.len(), value["id"])
            }),
        )
        .route("/api/json", post(|Json(value): Json<Value>| async move { Json(value) }))
        .route("/api/raw", post(|raw: RawBody| async move { raw.0 }))
        .route(
            "/api/unlimited",
            post(|req: Request| async move {
                let has_raw = req.extensions().get::<RawBody>().is_some();
                let len = axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap().len();
                format!("{has_raw}|{len}")
            }),
        )
        .layer(middleware::from_fn_with_state(capture, capture_raw_body));

    (router, stats)
}

fn post_request(path: &str, body: impl Into<Body>) -> Request {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn captured_bytes_are_exact() {
    let (app, _) = app();
    let sent = "{ \"id\" : \"evt_1\",\n  \"amount\": 1.50 }";

    let response = app.oneshot(post_request("/webhooks/raw", sent)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await, sent.as_bytes());
}

#[tokio::test]
async fn raw_body_and_json_extractor_both_see_the_body() {
    let (app, _) = app();
    let sent = r#"{"id":"evt_1"}"#;

    let response = app.oneshot(post_request("/webhooks/both", sent)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await, format!("{}|\"evt_1\"", sent.len()).as_bytes());
}

#[tokio::test]
async fn empty_body_is_captured_as_empty_buffer() {
    let (app, _) = app();

    let response = app.oneshot(post_request("/webhooks/raw", Body::empty())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_body(response).await.is_empty());
}

#[tokio::test]
async fn uncaptured_route_parses_json_normally() {
    let (app, _) = app();

    let response =
        app.oneshot(post_request("/api/json", r#"{"id":"evt_1","n":2}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["n"], 2);
}

#[tokio::test]
async fn uncaptured_route_has_no_raw_body() {
    let (app, _) = app();

    let response = app.oneshot(post_request("/api/raw", "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_json(response).await["error"]["code"], "E9001");
}

#[tokio::test]
async fn uncaptured_route_is_not_size_limited() {
    let (app, stats) = app();
    let big = "x".repeat(LIMIT * 4);

    let response = app.oneshot(post_request("/api/unlimited", big.clone())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await, format!("false|{}", big.len()).as_bytes());
    assert_eq!(stats.snapshot().oversized_bodies, 0);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, stats) = app();

    let response =
        app.oneshot(post_request("/webhooks/raw", "x".repeat(LIMIT + 1))).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(read_json(response).await["error"]["code"], "E2001");
    assert_eq!(stats.snapshot().oversized_bodies, 1);
}

#[tokio::test]
async fn body_at_limit_is_accepted() {
    let (app, _) = app();

    let response = app.oneshot(post_request("/webhooks/raw", "x".repeat(LIMIT))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn declared_oversized_length_fails_fast() {
    let (app, stats) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/raw")
        .header("content-length", (LIMIT * 10).to_string())
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(stats.snapshot().oversized_bodies, 1);
}

#[tokio::test]
async fn streamed_body_without_length_is_still_limited() {
    let (app, _) = app();
    let chunks: Vec<Result<String, std::io::Error>> =
        (0..8).map(|_| Ok("x".repeat(LIMIT / 4))).collect();
    let body = Body::from_stream(futures_stream(chunks));

    let response = app.oneshot(post_request("/webhooks/raw", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

fn futures_stream(
    chunks: Vec<Result<String, std::io::Error>>,
) -> impl futures::Stream<Item = Result<String, std::io::Error>> + Send + 'static {
    futures::stream::iter(chunks)
}
