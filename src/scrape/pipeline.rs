// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search + scrape pipeline
//!
//! `list` runs the search step only. `search` also turns the ranked results
//! into candidates and fetches them through the orchestrator.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::classifier::SignatureClassifier;
use super::config::ScrapeConfig;
use super::escalation::{EscalationMachine, EscalationSettings};
use super::extractor::HtmlMarkdownExtractor;
use super::fetcher::{FetchError, HttpFetcher};
use super::negative_cache::{CacheError, NegativeCache};
use super::orchestrator::FetchOrchestrator;
use super::renderer::{ChromiumFetcher, RendererConfig};
use super::safety::UrlSafetyPolicy;
use super::scheduler::DomainScheduler;
use super::types::{CandidateUrl, PageResult};
use crate::search::{SearchConfig, SearchError, SearchQuery, SearchResult, SearchService};

/// Pipeline construction errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("search provider: {0}")]
    Search(#[from] SearchError),
    #[error("negative cache: {0}")]
    Cache(#[from] CacheError),
    #[error("fetcher: {0}")]
    Fetch(#[from] FetchError),
}

pub struct SearchScrapePipeline {
    search: Arc<SearchService>,
    orchestrator: FetchOrchestrator,
}

impl SearchScrapePipeline {
    pub fn new(search: Arc<SearchService>, orchestrator: FetchOrchestrator) -> Self {
        Self {
            search,
            orchestrator,
        }
    }

    /// Wire up DuckDuckGo, reqwest, Chromium and the on-disk negative cache
    pub fn from_config(
        search_config: SearchConfig,
        scrape_config: &ScrapeConfig,
    ) -> Result<Self, PipelineError> {
        search_config.validate().map_err(PipelineError::Config)?;
        scrape_config.validate().map_err(PipelineError::Config)?;

        let search = Arc::new(SearchService::new(search_config)?);
        let safety = UrlSafetyPolicy::new(scrape_config.allow_private_hosts);
        let cache = Arc::new(NegativeCache::open(scrape_config.negative_cache_dir.clone())?);
        let scheduler = Arc::new(
            DomainScheduler::new(
                scrape_config.global_concurrency,
                scrape_config.per_domain_concurrency,
            )
            .with_slow_acquire_warning(scrape_config.slow_acquire_warn),
        );

        let light = HttpFetcher::new(scrape_config.fetch_timeout, safety)?
            .with_max_body_bytes(scrape_config.max_body_bytes);
        let mut machine = EscalationMachine::new(
            Arc::new(light),
            Arc::new(SignatureClassifier::new()),
            Arc::new(HtmlMarkdownExtractor::new()),
            Arc::clone(&cache),
            EscalationSettings {
                fetch_timeout: scrape_config.fetch_timeout,
                min_markdown_chars: scrape_config.min_markdown_chars,
                negative_ttl: scrape_config.negative_cache_ttl,
            },
        );
        if scrape_config.browser_enabled {
            machine = machine.with_rendered(Arc::new(ChromiumFetcher::new(
                RendererConfig {
                    chrome_path: scrape_config.chrome_path.clone(),
                    navigation_timeout: scrape_config.fetch_timeout,
                },
                safety,
            )));
        }

        info!(
            "Pipeline ready: provider={}, global={}, per_domain={}, browser={}, cache={}",
            search.provider_name(),
            scrape_config.global_concurrency,
            scrape_config.per_domain_concurrency,
            scrape_config.browser_enabled,
            cache.dir().display()
        );

        let orchestrator = FetchOrchestrator::new(scheduler, cache, Arc::new(machine), safety);
        Ok(Self::new(search, orchestrator))
    }

    /// Search only; no fetching, no scheduler or cache involvement
    pub async fn list(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        self.search.search(query).await
    }

    /// Search, then fetch and convert the results to Markdown
    pub async fn search(
        &self,
        query: &SearchQuery,
        enable_browser: bool,
    ) -> Result<Vec<PageResult>, SearchError> {
        let results = self.search.search(query).await?;
        let candidates = CandidateUrl::from_search_results(&results);
        Ok(self.orchestrator.run(candidates, enable_browser).await)
    }

    pub fn cache(&self) -> &Arc<NegativeCache> {
        self.orchestrator.cache()
    }

    pub fn scheduler(&self) -> &Arc<DomainScheduler> {
        self.orchestrator.scheduler()
    }

    pub fn search_service(&self) -> &Arc<SearchService> {
        &self.search
    }
}
