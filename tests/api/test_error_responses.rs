// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Error status codes and bodies

use crate::common::{engine, pipeline, EngineOptions, FakeProvider, ScriptedFetcher};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use search_scrape_node::{
    api::{create_router, AppState, ErrorResponse},
    search::SearchError,
};
use tower::util::ServiceExt;

fn app_with(provider: FakeProvider) -> (Router, tempfile::TempDir) {
    let (pipeline, dir) = pipeline(
        provider,
        engine(
            ScriptedFetcher::new("light"),
            ScriptedFetcher::new("rendered"),
            EngineOptions::default(),
        ),
    );
    (create_router(AppState::new(pipeline)), dir)
}

async fn send(app: Router, uri: &str, body: &str) -> (StatusCode, ErrorResponse) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (app, _dir) = app_with(FakeProvider::with_urls(&[]));
    let (status, body) = send(app, "/search", r#"{"q": "#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error_type, "invalid_request");
}

#[tokio::test]
async fn test_missing_query_is_400() {
    let (app, _dir) = app_with(FakeProvider::with_urls(&[]));
    let (status, body) = send(app, "/list", r#"{"k": 3}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error_type, "invalid_request");
}

#[tokio::test]
async fn test_k_out_of_range_is_400() {
    for k in [0, 51] {
        let (app, _dir) = app_with(FakeProvider::with_urls(&[]));
        let (status, body) = send(app, "/search", &format!(r#"{{"q": "rust", "k": {}}}"#, k)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_type, "validation_error");
        let details = body.details.unwrap();
        assert_eq!(details["field"], "k");
    }
}

#[tokio::test]
async fn test_blank_query_is_400() {
    let (app, _dir) = app_with(FakeProvider::with_urls(&[]));
    let (status, body) = send(app, "/search", r#"{"q": "   "}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.details.unwrap()["field"], "q");
}

#[tokio::test]
async fn test_provider_failure_is_502() {
    let (app, _dir) = app_with(FakeProvider::failing(|| SearchError::ApiError {
        status: 503,
        message: "upstream unavailable".to_string(),
    }));
    let (status, body) = send(app, "/search", r#"{"q": "rust"}"#).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body.error_type, "search_failed");
    assert!(body.message.contains("upstream unavailable"));
}

#[tokio::test]
async fn test_provider_rate_limit_is_502_with_retry_after() {
    let (app, _dir) = app_with(FakeProvider::failing(|| SearchError::RateLimited {
        retry_after_secs: 30,
    }));
    let (status, body) = send(app, "/list", r#"{"q": "rust"}"#).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body.error_type, "search_rate_limited");
    assert_eq!(body.details.unwrap()["retry_after"], 30);
}

#[tokio::test]
async fn test_provider_timeout_is_502() {
    let (app, _dir) = app_with(FakeProvider::failing(|| SearchError::Timeout {
        timeout_ms: 15000,
    }));
    let (status, body) = send(app, "/search", r#"{"q": "rust"}"#).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body.error_type, "search_timeout");
}
