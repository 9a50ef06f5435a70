// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search API response types

use serde::{Deserialize, Serialize};

use crate::scrape::PageResult;
use crate::search::SearchResult;

/// Response body for POST /search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchApiResponse {
    /// The original search query
    pub query: String,
    /// Requested result count
    pub k: usize,
    /// Scraped pages in search-rank order
    pub docs: Vec<PageResult>,
}

impl SearchApiResponse {
    pub fn new(query: String, k: usize, docs: Vec<PageResult>) -> Self {
        Self { query, k, docs }
    }
}

/// One entry of a POST /list response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDoc {
    pub url: String,
    pub title: String,
    pub snippet: Option<String>,
}

impl From<SearchResult> for ListDoc {
    fn from(result: SearchResult) -> Self {
        Self {
            url: result.url,
            title: result.title,
            snippet: result.snippet,
        }
    }
}

/// Response body for POST /list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListApiResponse {
    pub query: String,
    pub k: usize,
    pub docs: Vec<ListDoc>,
}

impl ListApiResponse {
    pub fn new(query: String, k: usize, results: Vec<SearchResult>) -> Self {
        Self {
            query,
            k,
            docs: results.into_iter().map(ListDoc::from).collect(),
        }
    }
}
