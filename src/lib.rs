// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod scrape;
pub mod search;
pub mod utils;
pub mod version;

// Re-export main types
pub use scrape::{
    CandidateUrl, DomainScheduler, EscalationMachine, FetchOrchestrator, NegativeCache,
    OutcomeKind, PageResult, ScrapeConfig, SearchScrapePipeline,
};
pub use search::{SearchConfig, SearchQuery, SearchResult, SearchService};
