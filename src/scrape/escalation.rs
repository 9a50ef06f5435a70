// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fetch escalation state machine
//!
//! One URL moves through
//! `Init -> LightFetched -> {Accepted, Escalate, NegativeOutcome}` and
//! `Escalate -> RenderedFetched -> {Accepted, NegativeOutcome}`.
//! There is at most one rendered attempt per URL. Negative outcomes are
//! written to the negative cache before the machine returns.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::classifier::BlockClassifier;
use super::extractor::MarkdownExtractor;
use super::fetcher::{FetchError, PageFetcher};
use super::negative_cache::NegativeCache;
use super::types::{
    ExtractedPage, FetchAttemptResult, FetchStage, FetchStatus, OutcomeKind, RawPage,
};

/// Per-URL escalation state
#[derive(Debug, Clone)]
pub enum EscalationState {
    Init,
    LightFetched(FetchAttemptResult),
    /// Light attempt was too short; a rendered attempt follows
    Escalate(FetchAttemptResult),
    RenderedFetched(FetchAttemptResult),
    Accepted(FetchAttemptResult),
    NegativeOutcome(FetchAttemptResult),
}

impl EscalationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EscalationState::Accepted(_) | EscalationState::NegativeOutcome(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            EscalationState::Init => "init",
            EscalationState::LightFetched(_) => "light_fetched",
            EscalationState::Escalate(_) => "escalate",
            EscalationState::RenderedFetched(_) => "rendered_fetched",
            EscalationState::Accepted(_) => "accepted",
            EscalationState::NegativeOutcome(_) => "negative_outcome",
        }
    }
}

/// Transition out of a fetched state
///
/// `can_escalate` is true when the caller permits escalation and a rendered
/// fetcher is configured. States that need I/O to advance (`Init`,
/// `Escalate`) and terminal states are returned unchanged.
pub fn next_state(state: EscalationState, can_escalate: bool) -> EscalationState {
    match state {
        EscalationState::LightFetched(attempt) => match attempt.status {
            FetchStatus::Blocked(_) | FetchStatus::Error(_) => {
                EscalationState::NegativeOutcome(attempt)
            }
            FetchStatus::Success => EscalationState::Accepted(attempt),
            FetchStatus::TooShort if can_escalate => EscalationState::Escalate(attempt),
            FetchStatus::TooShort => EscalationState::Accepted(attempt),
        },
        EscalationState::RenderedFetched(attempt) => match attempt.status {
            FetchStatus::Blocked(_) | FetchStatus::Error(_) => {
                EscalationState::NegativeOutcome(attempt)
            }
            // No second tier: a short rendered page is still accepted
            FetchStatus::Success | FetchStatus::TooShort => EscalationState::Accepted(attempt),
        },
        other => other,
    }
}

/// Response-level rules, in order: block/auth, 429, 5xx, anything but 200,
/// non-HTML content. `None` means the page goes on to extraction.
pub fn classify_response(
    page: &RawPage,
    classifier: &dyn BlockClassifier,
) -> Option<(FetchStatus, String)> {
    if matches!(page.status, 401 | 403 | 407) {
        let reason = classifier
            .detect(page)
            .unwrap_or_else(|| format!("http_{}", page.status));
        return Some((FetchStatus::Blocked(OutcomeKind::Forbidden), format!("bot:{}", reason)));
    }
    if let Some(reason) = classifier.detect(page) {
        return Some((FetchStatus::Blocked(OutcomeKind::Forbidden), format!("bot:{}", reason)));
    }
    match page.status {
        429 => Some((
            FetchStatus::Blocked(OutcomeKind::RateLimited),
            "http_429".to_string(),
        )),
        s if s >= 500 => Some((
            FetchStatus::Error(OutcomeKind::ServerError),
            format!("http_{}", s),
        )),
        s if s != 200 => Some((
            FetchStatus::Error(OutcomeKind::ClientError),
            format!("http_{}", s),
        )),
        _ => match &page.content_type {
            Some(ct) if !ct.to_ascii_lowercase().contains("html") => Some((
                FetchStatus::Error(OutcomeKind::UnsupportedContent),
                format!("non_html:{}", ct),
            )),
            _ => None,
        },
    }
}

fn fetch_error_reason(error: &FetchError) -> String {
    match error {
        FetchError::Timeout(_) => "timeout".to_string(),
        FetchError::Transport(msg) => format!("transport:{}", msg),
        FetchError::UnsafeUrl(_) => "unsafe_url".to_string(),
        FetchError::RendererUnavailable(_) => "renderer_unavailable".to_string(),
    }
}

/// Timing and threshold settings for the machine
#[derive(Debug, Clone, Copy)]
pub struct EscalationSettings {
    /// Hard deadline per attempt
    pub fetch_timeout: Duration,
    /// Markdown shorter than this is `TooShort`
    pub min_markdown_chars: usize,
    /// TTL written with negative outcomes
    pub negative_ttl: Duration,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(20),
            min_markdown_chars: 400,
            negative_ttl: Duration::from_secs(1800),
        }
    }
}

/// Drives one URL from `Init` to a terminal state
pub struct EscalationMachine {
    light: Arc<dyn PageFetcher>,
    rendered: Option<Arc<dyn PageFetcher>>,
    classifier: Arc<dyn BlockClassifier>,
    extractor: Arc<dyn MarkdownExtractor>,
    cache: Arc<NegativeCache>,
    settings: EscalationSettings,
}

impl EscalationMachine {
    pub fn new(
        light: Arc<dyn PageFetcher>,
        classifier: Arc<dyn BlockClassifier>,
        extractor: Arc<dyn MarkdownExtractor>,
        cache: Arc<NegativeCache>,
        settings: EscalationSettings,
    ) -> Self {
        Self {
            light,
            rendered: None,
            classifier,
            extractor,
            cache,
            settings,
        }
    }

    /// Enable the rendered fetch path
    pub fn with_rendered(mut self, rendered: Arc<dyn PageFetcher>) -> Self {
        self.rendered = Some(rendered);
        self
    }

    pub fn has_rendered(&self) -> bool {
        self.rendered.is_some()
    }

    pub fn settings(&self) -> &EscalationSettings {
        &self.settings
    }

    /// Run the machine for `url`; returns `Accepted` or `NegativeOutcome`
    pub async fn run(&self, url: &str, enable_browser: bool) -> EscalationState {
        let can_escalate = enable_browser && self.rendered.is_some();
        let mut state = EscalationState::Init;

        loop {
            state = match state {
                EscalationState::Init => EscalationState::LightFetched(
                    self.attempt(self.light.as_ref(), url, FetchStage::Light)
                        .await,
                ),
                EscalationState::Escalate(light_attempt) => {
                    let Some(rendered) = self.rendered.as_deref() else {
                        // Unreachable when can_escalate is honored; accept what we have
                        return EscalationState::Accepted(light_attempt);
                    };
                    info!(
                        "Escalating {} to rendered fetch ({} chars < {})",
                        url, light_attempt.extracted_chars, self.settings.min_markdown_chars
                    );
                    match self.timed_fetch(rendered, url).await {
                        Err(FetchError::RendererUnavailable(msg)) => {
                            warn!("Rendered fetch unavailable for {}: {}", url, msg);
                            EscalationState::Accepted(light_attempt)
                        }
                        result => EscalationState::RenderedFetched(
                            self.evaluate(url, FetchStage::Rendered, result).await,
                        ),
                    }
                }
                terminal @ (EscalationState::Accepted(_)
                | EscalationState::NegativeOutcome(_)) => {
                    if let EscalationState::NegativeOutcome(attempt) = &terminal {
                        self.record_negative(attempt).await;
                    }
                    return terminal;
                }
                fetched => next_state(fetched, can_escalate),
            };
            debug!("{} -> {}", url, state.name());
        }
    }

    async fn attempt(
        &self,
        fetcher: &dyn PageFetcher,
        url: &str,
        stage: FetchStage,
    ) -> FetchAttemptResult {
        let result = self.timed_fetch(fetcher, url).await;
        self.evaluate(url, stage, result).await
    }

    async fn timed_fetch(&self, fetcher: &dyn PageFetcher, url: &str) -> Result<RawPage, FetchError> {
        match tokio::time::timeout(self.settings.fetch_timeout, fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(url.to_string())),
        }
    }

    /// Apply the rules to one attempt's result
    async fn evaluate(
        &self,
        url: &str,
        stage: FetchStage,
        result: Result<RawPage, FetchError>,
    ) -> FetchAttemptResult {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                debug!("{} fetch failed for {}: {}", stage, url, e);
                return FetchAttemptResult {
                    url: url.to_string(),
                    stage,
                    status: FetchStatus::Error(OutcomeKind::NetworkError),
                    http_status: None,
                    reason: fetch_error_reason(&e),
                    final_url: None,
                    content: None,
                    extracted_chars: 0,
                };
            }
        };

        if let Some((status, reason)) = classify_response(&page, self.classifier.as_ref()) {
            return FetchAttemptResult {
                url: url.to_string(),
                stage,
                status,
                http_status: Some(page.status),
                reason,
                final_url: Some(page.final_url),
                content: None,
                extracted_chars: 0,
            };
        }

        let RawPage {
            status: http_status,
            final_url,
            body,
            ..
        } = page;
        let content = self.extract(body).await;
        let extracted_chars = content.char_count();
        let status = if extracted_chars >= self.settings.min_markdown_chars {
            FetchStatus::Success
        } else {
            FetchStatus::TooShort
        };

        FetchAttemptResult {
            url: url.to_string(),
            stage,
            status,
            http_status: Some(http_status),
            reason: if status == FetchStatus::Success {
                "ok".to_string()
            } else {
                "too_short".to_string()
            },
            final_url: Some(final_url),
            content: Some(content),
            extracted_chars,
        }
    }

    async fn extract(&self, body: String) -> ExtractedPage {
        let extractor = Arc::clone(&self.extractor);
        match tokio::task::spawn_blocking(move || extractor.extract(&body)).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Extraction task failed: {}", e);
                ExtractedPage::default()
            }
        }
    }

    async fn record_negative(&self, attempt: &FetchAttemptResult) {
        let Some(kind) = attempt.status.negative_kind() else {
            return;
        };
        warn!(
            "Negative outcome for {} at {} stage: {} ({})",
            attempt.url, attempt.stage, kind, attempt.reason
        );
        self.cache
            .record_outcome(
                &attempt.url,
                kind,
                &attempt.reason,
                attempt.http_status,
                self.settings.negative_ttl,
            )
            .await;
    }
}
