// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page fetchers
//!
//! [`PageFetcher`] is the seam between the escalation state machine and the
//! network. [`HttpFetcher`] is the light path: a single reqwest GET with
//! browser-like headers. The rendered path lives in `renderer`.

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect, Client, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::safety::UrlSafetyPolicy;
use super::types::RawPage;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const MAX_REDIRECTS: usize = 5;
const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Fetch failures that produced no HTTP response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The attempt exceeded its deadline
    #[error("timed out fetching {0}")]
    Timeout(String),
    /// Connection, TLS, DNS or body read failure
    #[error("transport error: {0}")]
    Transport(String),
    /// Refused by the outbound safety policy
    #[error("unsafe URL blocked: {0}")]
    UnsafeUrl(String),
    /// The rendered path cannot run (no browser, launch failure)
    #[error("renderer unavailable: {0}")]
    RendererUnavailable(String),
}

/// Fetches one URL and returns the raw response
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchError>;

    /// Fetcher name for logging
    fn name(&self) -> &'static str;
}

/// Plain HTTP fetcher
pub struct HttpFetcher {
    client: Client,
    safety: UrlSafetyPolicy,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher
    ///
    /// # Arguments
    /// * `timeout` - Client-level request timeout
    /// * `safety` - Outbound URL policy, also applied to every redirect hop
    pub fn new(timeout: Duration, safety: UrlSafetyPolicy) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ja,en-US;q=0.9,en;q=0.8"),
        );

        let redirect_policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if safety.check_syntax(attempt.url().as_str()).is_err() {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(redirect_policy)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            safety,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Truncate response bodies past `limit` bytes (min 1)
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit.max(1);
        self
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}

/// Read at most `limit` bytes; the flag is set when the rest was dropped
async fn read_capped(
    mut response: Response,
    url: &str,
    limit: usize,
) -> Result<(Vec<u8>, bool), FetchError> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| transport_error(url, e))?
    {
        let room = limit - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }
    Ok((body, false))
}

fn charset_of(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"'))
}

/// Decode with the declared charset, UTF-8 otherwise (a BOM wins)
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_of)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchError> {
        self.safety
            .check_resolved(url)
            .await
            .map_err(|e| FetchError::UnsafeUrl(format!("{}: {}", url, e)))?;

        debug!("Fetching (light): {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let (bytes, truncated) = read_capped(response, url, self.max_body_bytes).await?;
        if truncated {
            warn!(
                "Body of {} exceeds {} bytes, truncated",
                url, self.max_body_bytes
            );
        }
        let body = decode_body(&bytes, content_type.as_deref());

        debug!("Fetched {} -> HTTP {} ({} bytes)", url, status, body.len());

        Ok(RawPage {
            requested_url: url.to_string(),
            final_url,
            status,
            content_type,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
