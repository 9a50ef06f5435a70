// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for the fetch orchestration engine

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::search::SearchResult;
use crate::utils::{domain_of, normalize_url};

/// A URL selected for fetching, in search-rank order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    /// Normalized absolute URL
    pub url: String,
    /// Lowercased host, used for scheduling and logging
    pub domain: String,
    /// 1-based position in the search ranking
    pub rank: usize,
}

impl CandidateUrl {
    /// Build a candidate from a raw URL; `None` if it is not an absolute http(s) URL
    pub fn new(url: &str, rank: usize) -> Option<Self> {
        let url = normalize_url(url)?;
        let domain = domain_of(&url)?;
        Some(Self { url, domain, rank })
    }

    /// Candidates for a ranked result list, de-duplicated by normalized URL
    pub fn from_search_results(results: &[SearchResult]) -> Vec<Self> {
        let mut seen = std::collections::HashSet::new();
        results
            .iter()
            .filter_map(|r| Self::new(&r.url, r.rank))
            .filter(|c| seen.insert(c.url.clone()))
            .collect()
    }
}

/// A negative outcome worth remembering for a while
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// HTTP 429
    RateLimited,
    /// 401/403/407 or a bot-detection / challenge page
    #[serde(rename = "forbidden_bot_detected")]
    Forbidden,
    /// HTTP 5xx
    ServerError,
    /// Connection failure, timeout, or a disallowed resolved address
    NetworkError,
    /// Any other status than 200 (204, 404, 410, ...)
    ClientError,
    /// 200 with a non-HTML content type
    UnsupportedContent,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeKind::RateLimited => "rate_limited",
            OutcomeKind::Forbidden => "forbidden_bot_detected",
            OutcomeKind::ServerError => "server_error",
            OutcomeKind::NetworkError => "network_error",
            OutcomeKind::ClientError => "client_error",
            OutcomeKind::UnsupportedContent => "unsupported_content",
        };
        f.write_str(s)
    }
}

/// Which fetch path produced an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStage {
    /// Plain HTTP fetch
    Light,
    /// Headless browser fetch
    Rendered,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Light => f.write_str("light"),
            FetchStage::Rendered => f.write_str("rendered"),
        }
    }
}

/// Raw response from a fetch path
#[derive(Debug, Clone)]
pub struct RawPage {
    pub requested_url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Title and Markdown extracted from a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: String,
    pub markdown: String,
}

impl ExtractedPage {
    /// Extracted length in characters
    pub fn char_count(&self) -> usize {
        self.markdown.chars().count()
    }
}

/// Classification of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// 200 with enough extracted text
    Success,
    /// The target refused us (forbidden, bot page, rate limit)
    Blocked(OutcomeKind),
    /// Transport, server or content failure
    Error(OutcomeKind),
    /// 200 but the extracted text is below the threshold
    TooShort,
}

impl FetchStatus {
    /// The cacheable kind, if this status is negative
    pub fn negative_kind(&self) -> Option<OutcomeKind> {
        match self {
            FetchStatus::Blocked(kind) | FetchStatus::Error(kind) => Some(*kind),
            FetchStatus::Success | FetchStatus::TooShort => None,
        }
    }
}

/// Outcome of one fetch attempt at one stage
#[derive(Debug, Clone)]
pub struct FetchAttemptResult {
    pub url: String,
    pub stage: FetchStage,
    pub status: FetchStatus,
    /// HTTP status, `None` when no response was received
    pub http_status: Option<u16>,
    /// Short machine-readable reason, stored with negative cache entries
    pub reason: String,
    /// Final URL after redirects, when a response was received
    pub final_url: Option<String>,
    pub content: Option<ExtractedPage>,
    pub extracted_chars: usize,
}

/// A successfully scraped page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub title: String,
    pub markdown: String,
}
