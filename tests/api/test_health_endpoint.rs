// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health

use crate::common::{engine, pipeline, EngineOptions, FakeProvider, ScriptedFetcher};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
};
use search_scrape_node::{
    api::{create_router, AppState, HealthResponse},
    scrape::OutcomeKind,
};
use std::time::Duration;
use tower::util::ServiceExt;

#[tokio::test]
async fn test_health_reports_limits_and_cache() {
    let e = engine(
        ScriptedFetcher::new("light"),
        ScriptedFetcher::new("rendered"),
        EngineOptions {
            global_limit: 6,
            per_domain_limit: 3,
            ..Default::default()
        },
    );
    e.cache
        .record(
            "https://blocked.example/",
            OutcomeKind::Forbidden,
            Duration::from_secs(600),
        )
        .await;
    let (pipeline, _dir) = pipeline(FakeProvider::with_urls(&[]), e);
    let app = create_router(AppState::new(pipeline));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.provider, "fake");
    assert_eq!(health.global_limit, 6);
    assert_eq!(health.per_domain_limit, 3);
    assert_eq!(health.in_flight, 0);
    assert_eq!(health.negative_cache.valid, 1);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (pipeline, _dir) = pipeline(
        FakeProvider::with_urls(&[]),
        engine(
            ScriptedFetcher::new("light"),
            ScriptedFetcher::new("rendered"),
            EngineOptions::default(),
        ),
    );
    let app = create_router(AppState::new(pipeline));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/v1/inference")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
