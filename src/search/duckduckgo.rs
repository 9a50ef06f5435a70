// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DuckDuckGo search provider
//!
//! Implements web search using DuckDuckGo's HTML interface.
//! No API key required.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

use super::provider::SearchProvider;
use super::types::{SearchError, SearchQuery, SearchResult};

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_REGION: &str = "jp-jp";

/// DuckDuckGo search provider (no API key required)
pub struct DuckDuckGoProvider {
    client: Client,
    timeout: Duration,
}

impl DuckDuckGoProvider {
    /// Create a new DuckDuckGo provider
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        // Use a realistic browser User-Agent to avoid being blocked
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .map_err(|e| SearchError::ApiError {
                status: 0,
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        let region = query
            .options
            .region
            .as_deref()
            .unwrap_or(DEFAULT_REGION);

        let mut form = vec![("q", query.q.as_str()), ("kl", region)];
        if let Some(df) = query.options.time_range.as_param() {
            form.push(("df", df));
        }

        let response = self
            .client
            .post(DDG_HTML_URL)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    SearchError::ApiError {
                        status: 0,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SearchError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if !status.is_success() {
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message: "DuckDuckGo request failed".to_string(),
            });
        }

        let html = response.text().await.map_err(|e| SearchError::ApiError {
            status: 0,
            message: e.to_string(),
        })?;

        // Over-fetch: normalization and de-duplication shrink the list later
        Ok(parse_ddg_html(&html, query.k.saturating_mul(3)))
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }
}

/// Parse DuckDuckGo HTML response to extract search results
fn parse_ddg_html(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let (Ok(link_sel), Ok(body_sel), Ok(snippet_sel)) = (
        Selector::parse("a.result__a"),
        Selector::parse("div.result__body"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut results = Vec::new();

    for link in document.select(&link_sel) {
        if results.len() >= max_results {
            break;
        }

        let url = link
            .value()
            .attr("href")
            .map(extract_ddg_url)
            .unwrap_or_default();
        let title = collapse_whitespace(&link.text().collect::<String>());

        // The snippet lives in the enclosing result body
        let snippet = link
            .ancestors()
            .filter_map(scraper::ElementRef::wrap)
            .find(|el| body_sel.matches(el))
            .and_then(|body| body.select(&snippet_sel).next())
            .map(|sn| collapse_whitespace(&sn.text().collect::<Vec<_>>().join(" ")))
            .filter(|s| !s.is_empty());

        if !url.is_empty() && !title.is_empty() {
            results.push(SearchResult {
                rank: results.len() + 1,
                title,
                url,
                snippet,
            });
        }
    }

    results
}

/// Extract actual URL from DuckDuckGo's redirect URL
fn extract_ddg_url(redirect_url: &str) -> String {
    // DDG URLs look like: //duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&...
    let absolute = if redirect_url.starts_with("//") {
        format!("https:{}", redirect_url)
    } else {
        redirect_url.to_string()
    };

    match Url::parse(&absolute) {
        Ok(parsed) => {
            if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
                return target.into_owned();
            }
            if parsed.host_str().map_or(false, |h| h.ends_with("duckduckgo.com")) {
                // Internal link (ads, "more results"), not a result
                return String::new();
            }
            absolute
        }
        Err(_) => String::new(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
