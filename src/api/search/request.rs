// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search API request types

use serde::{Deserialize, Serialize};

use crate::search::{SearchOptions, SearchQuery, TimeRange};

/// Maximum query length in characters
pub const MAX_QUERY_CHARS: usize = 500;
/// Upper bound for `k`
pub const MAX_K: usize = 50;

/// Request body for POST /search and POST /list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchApiRequest {
    /// Search query string (required, max 500 chars)
    pub q: String,

    /// Number of results (1-50, default 5)
    #[serde(default = "default_k")]
    pub k: usize,

    /// DuckDuckGo region code (default: jp-jp)
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// "any", "d", "w", "m" or "y"
    #[serde(default)]
    pub time_range: TimeRange,

    /// Allow escalation to the headless browser (default: true)
    #[serde(default = "default_enable_browser")]
    pub enable_browser: bool,
}

fn default_k() -> usize {
    5
}

fn default_region() -> String {
    "jp-jp".to_string()
}

fn default_enable_browser() -> bool {
    true
}

impl SearchApiRequest {
    /// Validate the request
    pub fn validate(&self) -> Result<(), String> {
        if self.q.trim().is_empty() {
            return Err("Query cannot be empty".to_string());
        }
        if self.q.chars().count() > MAX_QUERY_CHARS {
            return Err(format!(
                "Query too long (max {} characters)",
                MAX_QUERY_CHARS
            ));
        }
        if self.k < 1 {
            return Err("k must be at least 1".to_string());
        }
        if self.k > MAX_K {
            return Err(format!("k cannot exceed {}", MAX_K));
        }
        if self.region.trim().is_empty() {
            return Err("region cannot be empty".to_string());
        }
        Ok(())
    }

    /// Field that `validate` complains about, for error details
    pub fn invalid_field(&self) -> &'static str {
        if self.q.trim().is_empty() || self.q.chars().count() > MAX_QUERY_CHARS {
            "q"
        } else if self.k < 1 || self.k > MAX_K {
            "k"
        } else {
            "region"
        }
    }

    pub fn to_query(&self) -> SearchQuery {
        SearchQuery::new(self.q.trim(), self.k).with_options(SearchOptions {
            region: Some(self.region.clone()),
            language: self.language.clone(),
            time_range: self.time_range,
        })
    }
}
