// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for web search functionality

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time window filter understood by the search provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "w")]
    Week,
    #[serde(rename = "m")]
    Month,
    #[serde(rename = "y")]
    Year,
}

impl TimeRange {
    /// Provider parameter value, `None` for no filter
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            TimeRange::Any => None,
            TimeRange::Day => Some("d"),
            TimeRange::Week => Some("w"),
            TimeRange::Month => Some("m"),
            TimeRange::Year => Some("y"),
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" | "" => Ok(TimeRange::Any),
            "d" | "day" => Ok(TimeRange::Day),
            "w" | "week" => Ok(TimeRange::Week),
            "m" | "month" => Ok(TimeRange::Month),
            "y" | "year" => Ok(TimeRange::Year),
            other => Err(format!("unknown time range: {}", other)),
        }
    }
}

/// Provider-side filters for a query
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Region code (DuckDuckGo `kl`, e.g. "jp-jp", "us-en")
    pub region: Option<String>,
    /// Language hint; kept for providers that support it
    pub language: Option<String>,
    /// Time window filter
    pub time_range: TimeRange,
}

/// A search query
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// The search query string
    pub q: String,
    /// Number of results wanted
    pub k: usize,
    /// Provider filters
    pub options: SearchOptions,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>, k: usize) -> Self {
        Self {
            q: q.into(),
            k,
            options: SearchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }
}

/// A single ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// 1-based position in the provider's ranking
    pub rank: usize,
    /// Title of the search result
    pub title: String,
    /// URL of the search result
    pub url: String,
    /// Snippet/description of the search result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Rate limited by the search provider
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// API error from the search provider
    #[error("Search API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Search request timed out
    #[error("Search timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Invalid search query
    #[error("Invalid query: {reason}")]
    InvalidQuery {
        /// Reason the query is invalid
        reason: String,
    },
}
