// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fetch orchestration engine
//!
//! Turns ranked search results into clean Markdown:
//! - Negative outcome cache (on-disk, TTL)
//! - Global + per-domain concurrency scheduling
//! - Light HTTP fetch with escalation to headless Chromium
//! - Block-page classification and HTML to Markdown extraction

pub mod classifier;
pub mod config;
pub mod escalation;
pub mod extractor;
pub mod fetcher;
pub mod negative_cache;
pub mod orchestrator;
pub mod pipeline;
pub mod renderer;
pub mod safety;
pub mod scheduler;
pub mod types;

// Re-export commonly used types
pub use classifier::{BlockClassifier, SignatureClassifier};
pub use config::ScrapeConfig;
pub use escalation::{EscalationMachine, EscalationSettings, EscalationState};
pub use extractor::{HtmlMarkdownExtractor, MarkdownExtractor};
pub use fetcher::{FetchError, HttpFetcher, PageFetcher};
pub use negative_cache::{CacheEntry, CacheError, NegativeCache, NegativeCacheStats};
pub use orchestrator::FetchOrchestrator;
pub use pipeline::{PipelineError, SearchScrapePipeline};
pub use renderer::{ChromiumFetcher, RendererConfig};
pub use safety::{UnsafeUrlError, UrlSafetyPolicy};
pub use scheduler::{DomainScheduler, SlotLease};
pub use types::{
    CandidateUrl, ExtractedPage, FetchAttemptResult, FetchStage, FetchStatus, OutcomeKind,
    PageResult, RawPage,
};
