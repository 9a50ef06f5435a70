// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Global and per-domain concurrency ceilings under load

use crate::common::{candidates, engine, EngineOptions, Route, ScriptedFetcher};
use std::time::Duration;

const DELAY: Duration = Duration::from_millis(80);

#[tokio::test]
async fn test_per_domain_ceiling_holds() {
    let urls: Vec<String> = (0..8)
        .map(|i| format!("https://same.example/page{}", i))
        .collect();
    let mut light = ScriptedFetcher::new("light");
    for url in &urls {
        light = light.route(url, Route::html(1000).with_delay(DELAY));
    }
    let e = engine(
        light,
        ScriptedFetcher::new("rendered"),
        EngineOptions {
            global_limit: 8,
            per_domain_limit: 2,
            ..Default::default()
        },
    );

    let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let pages = e.orchestrator.run(candidates(&refs), false).await;

    assert_eq!(pages.len(), 8);
    assert_eq!(e.light.peak_for("same.example"), 2);
    assert_eq!(e.scheduler.in_flight(), 0);
}

#[tokio::test]
async fn test_global_ceiling_holds_across_domains() {
    let urls: Vec<String> = (0..10)
        .map(|i| format!("https://host{}.example/", i))
        .collect();
    let mut light = ScriptedFetcher::new("light");
    for url in &urls {
        light = light.route(url, Route::html(1000).with_delay(DELAY));
    }
    let e = engine(
        light,
        ScriptedFetcher::new("rendered"),
        EngineOptions {
            global_limit: 3,
            per_domain_limit: 2,
            ..Default::default()
        },
    );

    let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let pages = e.orchestrator.run(candidates(&refs), false).await;

    assert_eq!(pages.len(), 10);
    assert_eq!(e.light.peak(), 3);
}

#[tokio::test]
async fn test_slow_domain_does_not_exceed_its_share() {
    let mut light = ScriptedFetcher::new("light");
    let mut urls = Vec::new();
    for i in 0..4 {
        let slow = format!("https://slow.example/{}", i);
        let fast = format!("https://fast{}.example/", i);
        light = light
            .route(&slow, Route::html(1000).with_delay(Duration::from_millis(150)))
            .route(&fast, Route::html(1000).with_delay(Duration::from_millis(10)));
        urls.push(slow);
        urls.push(fast);
    }
    let e = engine(
        light,
        ScriptedFetcher::new("rendered"),
        EngineOptions {
            global_limit: 8,
            per_domain_limit: 1,
            ..Default::default()
        },
    );

    let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let pages = e.orchestrator.run(candidates(&refs), false).await;

    assert_eq!(pages.len(), 8);
    assert_eq!(e.light.peak_for("slow.example"), 1);
    assert_eq!(e.scheduler.in_flight_for("slow.example"), 0);
}

#[tokio::test]
async fn test_escalated_fetch_holds_the_same_slot() {
    let url = "https://one.example/";
    let light = ScriptedFetcher::new("light").route(url, Route::html(50).with_delay(DELAY));
    let rendered = ScriptedFetcher::new("rendered").route(url, Route::html(900).with_delay(DELAY));
    let e = engine(
        light,
        rendered,
        EngineOptions {
            global_limit: 1,
            per_domain_limit: 1,
            ..Default::default()
        },
    );

    let pages = e.orchestrator.run(candidates(&[url]), true).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(e.light.peak(), 1);
    assert_eq!(e.rendered.peak(), 1);
    assert_eq!(e.scheduler.in_flight(), 0);
}
