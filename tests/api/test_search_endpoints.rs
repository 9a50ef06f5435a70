// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! /search and /list against a fake provider and fake fetchers

use crate::common::{engine, pipeline, EngineOptions, FakeProvider, Route, ScriptedFetcher};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
};
use search_scrape_node::api::{create_router, AppState, ListApiResponse, SearchApiResponse};
use tower::util::ServiceExt; // for `oneshot`

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_search_returns_docs_in_rank_order() {
    let urls = [
        "https://one.example/",
        "https://two.example/?utm_source=ddg",
        "https://three.example/",
    ];
    let light = ScriptedFetcher::new("light")
        .route("https://one.example/", Route::html(600))
        .route("https://two.example/", Route::status(503))
        .route("https://three.example/", Route::html(50));
    let rendered = ScriptedFetcher::new("rendered").route("https://three.example/", Route::html(800));
    let (pipeline, _dir) = pipeline(
        FakeProvider::with_urls(&urls),
        engine(light, rendered, EngineOptions::default()),
    );
    let app = create_router(AppState::new(pipeline));

    let response = app
        .oneshot(post("/search", r#"{"q": "rust async", "k": 3}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: SearchApiResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.query, "rust async");
    assert_eq!(body.k, 3);
    let got: Vec<&str> = body.docs.iter().map(|d| d.url.as_str()).collect();
    assert_eq!(got, vec!["https://one.example/", "https://three.example/"]);
    assert_eq!(body.docs[1].markdown.chars().count(), 800);
}

#[tokio::test]
async fn test_search_respects_enable_browser_false() {
    let light = ScriptedFetcher::new("light").route("https://spa.example/", Route::html(50));
    let rendered = ScriptedFetcher::new("rendered").route("https://spa.example/", Route::html(800));
    let e = engine(light, rendered, EngineOptions::default());
    let rendered = e.rendered.clone();
    let (pipeline, _dir) = pipeline(FakeProvider::with_urls(&["https://spa.example/"]), e);
    let app = create_router(AppState::new(pipeline));

    let response = app
        .oneshot(post(
            "/search",
            r#"{"q": "spa", "k": 1, "enable_browser": false}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: SearchApiResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.docs.len(), 1);
    assert_eq!(body.docs[0].markdown.chars().count(), 50);
    assert_eq!(rendered.call_count(), 0);
}

#[tokio::test]
async fn test_search_with_no_fetchable_pages_is_ok() {
    let light = ScriptedFetcher::new("light").route("https://down.example/", Route::status(500));
    let (pipeline, _dir) = pipeline(
        FakeProvider::with_urls(&["https://down.example/"]),
        engine(light, ScriptedFetcher::new("rendered"), EngineOptions::default()),
    );
    let app = create_router(AppState::new(pipeline));

    let response = app
        .oneshot(post("/search", r#"{"q": "nothing"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: SearchApiResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(body.docs.is_empty());
    assert_eq!(body.k, 5);
}

#[tokio::test]
async fn test_list_does_not_fetch() {
    let light = ScriptedFetcher::new("light").route("https://one.example/", Route::html(600));
    let e = engine(light, ScriptedFetcher::new("rendered"), EngineOptions::default());
    let light = e.light.clone();
    let (pipeline, _dir) = pipeline(
        FakeProvider::with_urls(&[
            "https://one.example/",
            "https://one.example/#section",
            "https://two.example/",
        ]),
        e,
    );
    let app = create_router(AppState::new(pipeline));

    let response = app
        .oneshot(post("/list", r#"{"q": "rust", "k": 5}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ListApiResponse = serde_json::from_slice(&bytes).unwrap();
    // Fragment-only duplicates collapse
    assert_eq!(body.docs.len(), 2);
    assert_eq!(body.docs[0].url, "https://one.example/");
    assert_eq!(body.docs[0].snippet.as_deref(), Some("Snippet 1"));
    assert_eq!(light.call_count(), 0);
}
