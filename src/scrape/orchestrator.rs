// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-request fan-out over candidate URLs
//!
//! Every candidate runs concurrently inside the request future: negative
//! cache check, slot lease, escalation machine. Dropping the request future
//! drops every in-flight fetch with it, and their leases go back to the
//! scheduler.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::escalation::{EscalationMachine, EscalationState};
use super::negative_cache::NegativeCache;
use super::safety::UrlSafetyPolicy;
use super::scheduler::DomainScheduler;
use super::types::{CandidateUrl, PageResult};

/// Runs candidates through cache, scheduler and escalation
pub struct FetchOrchestrator {
    scheduler: Arc<DomainScheduler>,
    cache: Arc<NegativeCache>,
    machine: Arc<EscalationMachine>,
    safety: UrlSafetyPolicy,
}

impl FetchOrchestrator {
    pub fn new(
        scheduler: Arc<DomainScheduler>,
        cache: Arc<NegativeCache>,
        machine: Arc<EscalationMachine>,
        safety: UrlSafetyPolicy,
    ) -> Self {
        Self {
            scheduler,
            cache,
            machine,
            safety,
        }
    }

    /// Fetch all candidates; results are in rank order, failures omitted
    pub async fn run(&self, candidates: Vec<CandidateUrl>, enable_browser: bool) -> Vec<PageResult> {
        let started = Instant::now();
        let total = candidates.len();

        let outcomes = join_all(
            candidates
                .into_iter()
                .map(|candidate| self.fetch_one(candidate, enable_browser)),
        )
        .await;

        let mut ranked: Vec<(usize, PageResult)> = outcomes.into_iter().flatten().collect();
        ranked.sort_by_key(|(rank, _)| *rank);

        info!(
            "Fetched {}/{} pages in {}ms",
            ranked.len(),
            total,
            started.elapsed().as_millis()
        );

        ranked.into_iter().map(|(_, page)| page).collect()
    }

    async fn fetch_one(
        &self,
        candidate: CandidateUrl,
        enable_browser: bool,
    ) -> Option<(usize, PageResult)> {
        if let Err(e) = self.safety.check_syntax(&candidate.url) {
            warn!("Skipping unsafe URL {}: {}", candidate.url, e);
            return None;
        }

        if let Some(kind) = self.cache.lookup(&candidate.url).await {
            info!("Negative cache hit, skipping {} ({})", candidate.url, kind);
            return None;
        }

        let lease = self.scheduler.acquire(&candidate.domain).await;
        let state = self.machine.run(&candidate.url, enable_browser).await;
        self.scheduler.release(lease);

        let EscalationState::Accepted(attempt) = state else {
            return None;
        };

        let content = attempt.content.unwrap_or_default();
        if content.markdown.is_empty() {
            debug!("Accepted page has no content, omitting {}", candidate.url);
            return None;
        }

        let url = attempt.final_url.unwrap_or_else(|| candidate.url.clone());
        let title = if content.title.is_empty() {
            url.clone()
        } else {
            content.title
        };

        Some((
            candidate.rank,
            PageResult {
                url,
                title,
                markdown: content.markdown,
            },
        ))
    }

    pub fn scheduler(&self) -> &Arc<DomainScheduler> {
        &self.scheduler
    }

    pub fn cache(&self) -> &Arc<NegativeCache> {
        &self.cache
    }
}
