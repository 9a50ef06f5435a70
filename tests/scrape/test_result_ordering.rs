// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Result ordering and shaping

use crate::common::{candidates, engine, EngineOptions, Route, ScriptedFetcher};
use std::time::Duration;

#[tokio::test]
async fn test_results_follow_search_rank() {
    let urls = [
        "https://a.example/",
        "https://b.example/",
        "https://c.example/",
        "https://d.example/",
    ];
    // Later ranks finish first
    let light = ScriptedFetcher::new("light")
        .route(urls[0], Route::html(500).with_delay(Duration::from_millis(150)))
        .route(urls[1], Route::html(500).with_delay(Duration::from_millis(100)))
        .route(urls[2], Route::status(500))
        .route(urls[3], Route::html(500));
    let e = engine(light, ScriptedFetcher::new("rendered"), EngineOptions::default());

    let pages = e.orchestrator.run(candidates(&urls), true).await;
    let got: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();

    assert_eq!(got, vec![urls[0], urls[1], urls[3]]);
}

#[tokio::test]
async fn test_result_uses_final_url_after_redirect() {
    let url = "https://short.example/r";
    let light = ScriptedFetcher::new("light").route(
        url,
        Route::html(500).redirected_to("https://www.long.example/article"),
    );
    let e = engine(light, ScriptedFetcher::new("rendered"), EngineOptions::default());

    let pages = e.orchestrator.run(candidates(&[url]), true).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].url, "https://www.long.example/article");
    // No title extracted, so the URL stands in
    assert_eq!(pages[0].title, "https://www.long.example/article");
}

#[tokio::test]
async fn test_empty_page_omitted() {
    let url = "https://blank.example/";
    let light = ScriptedFetcher::new("light").route(url, Route::html(0));
    let e = engine(light, ScriptedFetcher::new("rendered"), EngineOptions::default());

    // Browser off: the empty light page is accepted but has nothing to return
    let pages = e.orchestrator.run(candidates(&[url]), false).await;

    assert!(pages.is_empty());
    assert!(e.cache.lookup(url).await.is_none());
}

#[tokio::test]
async fn test_unsafe_candidates_dropped_before_cache() {
    let light = ScriptedFetcher::new("light")
        .route("http://127.0.0.1/admin", Route::html(500))
        .route("http://localhost/", Route::html(500))
        .route("https://ok.example/", Route::html(500));
    let e = engine(light, ScriptedFetcher::new("rendered"), EngineOptions::default());

    let pages = e
        .orchestrator
        .run(
            candidates(&[
                "http://127.0.0.1/admin",
                "http://localhost/",
                "https://ok.example/",
            ]),
            true,
        )
        .await;

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].url, "https://ok.example/");
    assert_eq!(e.light.calls(), vec!["https://ok.example/".to_string()]);
    assert_eq!(e.cache.stats().await.total, 0);
}
