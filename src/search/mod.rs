// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web search module
//!
//! Produces the ranked candidate list that the scrape pipeline fetches:
//! - DuckDuckGo HTML provider (no API key)
//! - Outbound rate limiting
//! - URL normalization, de-duplication and re-ranking

pub mod config;
pub mod duckduckgo;
pub mod provider;
pub mod rate_limiter;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::SearchConfig;
pub use provider::SearchProvider;
pub use service::SearchService;
pub use types::{SearchError, SearchOptions, SearchQuery, SearchResult, TimeRange};
