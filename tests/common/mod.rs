// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/common/mod.rs - Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use search_scrape_node::{
    scrape::{
        CandidateUrl, DomainScheduler, EscalationMachine, EscalationSettings, ExtractedPage,
        FetchError, FetchOrchestrator, MarkdownExtractor, NegativeCache, PageFetcher, RawPage,
        SignatureClassifier, UrlSafetyPolicy,
    },
    search::{SearchConfig, SearchError, SearchProvider, SearchQuery, SearchResult, SearchService},
    SearchScrapePipeline,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Canned response for one URL
#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
    pub delay: Duration,
    pub final_url: Option<String>,
}

impl Route {
    pub fn html(chars: usize) -> Self {
        Self {
            status: 200,
            body: "x".repeat(chars),
            content_type: Some("text/html; charset=utf-8".to_string()),
            delay: Duration::ZERO,
            final_url: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::html(20)
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn redirected_to(mut self, final_url: &str) -> Self {
        self.final_url = Some(final_url.to_string());
        self
    }
}

/// Fetcher answering from a route table, recording calls and peak concurrency
pub struct ScriptedFetcher {
    name: &'static str,
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    peak_by_domain: Mutex<HashMap<String, (usize, usize)>>,
}

impl ScriptedFetcher {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            peak_by_domain: Mutex::new(HashMap::new()),
        }
    }

    pub fn route(self, url: &str, route: Route) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), route);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn peak_for(&self, domain: &str) -> usize {
        self.peak_by_domain
            .lock()
            .unwrap()
            .get(domain)
            .map_or(0, |(_, peak)| *peak)
    }

    fn enter(&self, domain: &str) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let mut by_domain = self.peak_by_domain.lock().unwrap();
        let entry = by_domain.entry(domain.to_string()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = entry.1.max(entry.0);
    }

    fn leave(&self, domain: &str) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        if let Some(entry) = self.peak_by_domain.lock().unwrap().get_mut(domain) {
            entry.0 -= 1;
        }
    }
}

/// Decrements the active counters even when the fetch future is dropped
struct ActiveGuard<'a> {
    fetcher: &'a ScriptedFetcher,
    domain: String,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.fetcher.leave(&self.domain);
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Transport(format!("connection refused: {}", url)))?;

        let domain = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        self.enter(&domain);
        let _guard = ActiveGuard {
            fetcher: self,
            domain,
        };

        tokio::time::sleep(route.delay).await;
        Ok(RawPage {
            requested_url: url.to_string(),
            final_url: route.final_url.unwrap_or_else(|| url.to_string()),
            status: route.status,
            content_type: route.content_type,
            body: route.body,
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Treats the body as already-extracted Markdown
pub struct BodyExtractor;

impl MarkdownExtractor for BodyExtractor {
    fn extract(&self, html: &str) -> ExtractedPage {
        ExtractedPage {
            title: String::new(),
            markdown: html.to_string(),
        }
    }
}

/// Search provider returning a fixed ranking, or a fixed error
pub struct FakeProvider {
    urls: Vec<String>,
    fail_with: Option<fn() -> SearchError>,
}

impl FakeProvider {
    pub fn with_urls(urls: &[&str]) -> Self {
        Self {
            urls: urls.iter().map(|u| u.to_string()).collect(),
            fail_with: None,
        }
    }

    pub fn failing(error: fn() -> SearchError) -> Self {
        Self {
            urls: Vec::new(),
            fail_with: Some(error),
        }
    }
}

#[async_trait]
impl SearchProvider for FakeProvider {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        if let Some(error) = self.fail_with {
            return Err(error());
        }
        Ok(self
            .urls
            .iter()
            .enumerate()
            .map(|(i, url)| SearchResult {
                rank: i + 1,
                title: format!("Result {}", i + 1),
                url: url.clone(),
                snippet: Some(format!("Snippet {}", i + 1)),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Knobs for a test engine
pub struct EngineOptions {
    pub global_limit: usize,
    pub per_domain_limit: usize,
    pub min_markdown_chars: usize,
    pub fetch_timeout: Duration,
    pub negative_ttl: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            global_limit: 8,
            per_domain_limit: 2,
            min_markdown_chars: 400,
            fetch_timeout: Duration::from_secs(5),
            negative_ttl: Duration::from_secs(1800),
        }
    }
}

/// Orchestrator over fakes, plus handles for assertions
pub struct TestEngine {
    pub orchestrator: FetchOrchestrator,
    pub light: Arc<ScriptedFetcher>,
    pub rendered: Arc<ScriptedFetcher>,
    pub cache: Arc<NegativeCache>,
    pub scheduler: Arc<DomainScheduler>,
    // Keeps the cache directory alive
    pub dir: TempDir,
}

pub fn engine(light: ScriptedFetcher, rendered: ScriptedFetcher, opts: EngineOptions) -> TestEngine {
    let dir = TempDir::new().unwrap();
    let light = Arc::new(light);
    let rendered = Arc::new(rendered);
    let cache = Arc::new(NegativeCache::open(dir.path()).unwrap());
    let scheduler = Arc::new(DomainScheduler::new(opts.global_limit, opts.per_domain_limit));

    let machine = EscalationMachine::new(
        light.clone(),
        Arc::new(SignatureClassifier::new()),
        Arc::new(BodyExtractor),
        Arc::clone(&cache),
        EscalationSettings {
            fetch_timeout: opts.fetch_timeout,
            min_markdown_chars: opts.min_markdown_chars,
            negative_ttl: opts.negative_ttl,
        },
    )
    .with_rendered(rendered.clone());

    let orchestrator = FetchOrchestrator::new(
        Arc::clone(&scheduler),
        Arc::clone(&cache),
        Arc::new(machine),
        UrlSafetyPolicy::default(),
    );

    TestEngine {
        orchestrator,
        light,
        rendered,
        cache,
        scheduler,
        dir,
    }
}

/// Pipeline over a fake provider and fake fetchers
pub fn pipeline(provider: FakeProvider, engine: TestEngine) -> (Arc<SearchScrapePipeline>, TempDir) {
    let search = Arc::new(SearchService::with_provider(
        Arc::new(provider),
        SearchConfig::default(),
    ));
    let TestEngine {
        orchestrator, dir, ..
    } = engine;
    (Arc::new(SearchScrapePipeline::new(search, orchestrator)), dir)
}

/// Candidates in the given order, ranked from 1
pub fn candidates(urls: &[&str]) -> Vec<CandidateUrl> {
    urls.iter()
        .enumerate()
        .filter_map(|(i, u)| CandidateUrl::new(u, i + 1))
        .collect()
}
