// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! URL normalization shared by search de-duplication and the negative cache
//!
//! Normalization policy:
//! - scheme and host are lowercased, default ports dropped (by `url::Url`)
//! - an empty path becomes `/`
//! - the fragment is dropped
//! - tracking parameters are removed and the remaining query pairs sorted
//!
//! Any other query parameter is significant: `?page=2` and `?page=3` are
//! different targets.

use std::collections::HashSet;
use url::form_urlencoded;
use url::Url;

/// Query parameters that never change the page content
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "igshid",
    "mc_cid",
    "mc_eid",
    "ref",
    "ref_src",
    "spm",
    "yclid",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    TRACKING_PARAMS.contains(&key.as_str())
}

/// Normalize an absolute http(s) URL
///
/// Returns `None` for relative URLs, unparseable input and non-http schemes.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !is_tracking_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.sort();

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish();
            url.set_query(Some(&query));
        }
    }

    Some(url.to_string())
}

/// Lowercased host of an absolute URL
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// Remove duplicates, keeping the first occurrence
pub fn dedupe_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for url in urls {
        let url = url.into();
        if seen.insert(url.clone()) {
            out.push(url);
        }
    }
    out
}
