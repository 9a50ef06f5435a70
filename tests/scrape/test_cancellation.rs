// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Dropping a request mid-flight returns every slot

use crate::common::{candidates, engine, EngineOptions, Route, ScriptedFetcher};
use std::time::Duration;

#[tokio::test]
async fn test_timeout_of_request_releases_slots() {
    let urls = [
        "https://a.example/",
        "https://a.example/2",
        "https://b.example/",
        "https://c.example/",
    ];
    let mut light = ScriptedFetcher::new("light");
    for url in urls {
        light = light.route(url, Route::html(500).with_delay(Duration::from_secs(10)));
    }
    let e = engine(
        light,
        ScriptedFetcher::new("rendered"),
        EngineOptions {
            global_limit: 3,
            per_domain_limit: 1,
            fetch_timeout: Duration::from_secs(30),
            ..Default::default()
        },
    );

    let result = tokio::time::timeout(
        Duration::from_millis(150),
        e.orchestrator.run(candidates(&urls), true),
    )
    .await;
    assert!(result.is_err());

    assert_eq!(e.scheduler.in_flight(), 0);
    assert_eq!(e.scheduler.in_flight_for("a.example"), 0);
    // Nothing is cached for a cancelled fetch
    assert_eq!(e.cache.stats().await.total, 0);
}

#[tokio::test]
async fn test_slots_reusable_after_cancellation() {
    let url = "https://solo.example/";
    let light = ScriptedFetcher::new("light")
        .route(url, Route::html(500).with_delay(Duration::from_millis(300)));
    let e = engine(
        light,
        ScriptedFetcher::new("rendered"),
        EngineOptions {
            global_limit: 1,
            per_domain_limit: 1,
            ..Default::default()
        },
    );

    let first = e.orchestrator.run(candidates(&[url]), true);
    let cancelled = tokio::time::timeout(Duration::from_millis(50), first).await;
    assert!(cancelled.is_err());

    // With a single slot, this only completes if the first lease was returned
    let pages = tokio::time::timeout(
        Duration::from_secs(2),
        e.orchestrator.run(candidates(&[url]), true),
    )
    .await
    .expect("second request should get the slot");
    assert_eq!(pages.len(), 1);
}
