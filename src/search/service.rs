// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search service orchestration
//!
//! Wraps a provider with outbound rate limiting and turns its raw ranking
//! into a clean, de-duplicated top-k list.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::config::SearchConfig;
use super::duckduckgo::DuckDuckGoProvider;
use super::provider::SearchProvider;
use super::rate_limiter::SearchRateLimiter;
use super::types::{SearchError, SearchQuery, SearchResult};
use crate::utils::{dedupe_urls, normalize_url};

/// Search step of the pipeline
pub struct SearchService {
    provider: Arc<dyn SearchProvider>,
    rate_limiter: SearchRateLimiter,
    config: SearchConfig,
}

impl SearchService {
    /// Create a search service backed by DuckDuckGo
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let provider = DuckDuckGoProvider::new(config.request_timeout())?;
        Ok(Self::with_provider(Arc::new(provider), config))
    }

    /// Create a search service around any provider
    pub fn with_provider(provider: Arc<dyn SearchProvider>, config: SearchConfig) -> Self {
        let rate_limiter = SearchRateLimiter::new(config.rate_limit_per_minute);
        Self {
            provider,
            rate_limiter,
            config,
        }
    }

    /// Perform a search and return at most `query.k` normalized, unique results
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        if query.q.trim().is_empty() {
            return Err(SearchError::InvalidQuery {
                reason: "query cannot be empty".to_string(),
            });
        }

        let mut query = query.clone();
        if query.options.region.is_none() {
            query.options.region = Some(self.config.default_region.clone());
        }

        self.rate_limiter.wait().await;

        let start = Instant::now();
        let raw = self.provider.search(&query).await?;
        let results = rerank(raw, query.k);

        info!(
            "Search complete: {} results from {} in {}ms",
            results.len(),
            self.provider.name(),
            start.elapsed().as_millis()
        );

        Ok(results)
    }

    /// Name of the backing provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

/// Normalize, de-duplicate and re-rank raw provider results
///
/// The first result seen for a normalized URL supplies its title and snippet.
pub fn rerank(raw: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
    let mut best: HashMap<String, SearchResult> = HashMap::new();
    let mut order = Vec::new();

    for item in raw {
        let Some(normalized) = normalize_url(&item.url) else {
            debug!("Dropping non-http search result: {}", item.url);
            continue;
        };
        order.push(normalized.clone());
        best.entry(normalized).or_insert(item);
    }

    dedupe_urls(order)
        .into_iter()
        .take(k)
        .enumerate()
        .filter_map(|(i, url)| {
            best.remove(&url).map(|item| SearchResult {
                rank: i + 1,
                title: item.title,
                url,
                snippet: item.snippet,
            })
        })
        .collect()
}
