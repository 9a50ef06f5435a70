// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bot-detection and block-page classification

use regex::Regex;
use std::sync::OnceLock;

use super::types::RawPage;

/// Only the head of a 200 body is scanned for challenge signatures
const SCAN_PREFIX_BYTES: usize = 16 * 1024;

/// Decides whether a response is a block, auth wall or challenge page
pub trait BlockClassifier: Send + Sync {
    /// Reason string when the page should be treated as blocked
    fn detect(&self, page: &RawPage) -> Option<String>;
}

/// Rule-based classifier matching well-known challenge page signatures
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureClassifier;

fn signatures() -> &'static Regex {
    static SIGNATURES: OnceLock<Regex> = OnceLock::new();
    SIGNATURES.get_or_init(|| {
        Regex::new(
            r"(?i)checking your browser|just a moment|attention required|cloudflare|cdn-cgi/challenge|enable javascript and cookies|verify you are human|captcha|unusual traffic|access denied|bot detection|request blocked",
        )
        .expect("signature pattern is valid")
    })
}

fn body_prefix(body: &str) -> &str {
    if body.len() <= SCAN_PREFIX_BYTES {
        return body;
    }
    let mut end = SCAN_PREFIX_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

impl SignatureClassifier {
    pub fn new() -> Self {
        Self
    }

    fn matches(body: &str) -> bool {
        signatures().is_match(body_prefix(body))
    }
}

impl BlockClassifier for SignatureClassifier {
    fn detect(&self, page: &RawPage) -> Option<String> {
        match page.status {
            401 | 407 => Some("auth_required".to_string()),
            403 if Self::matches(&page.body) => Some("blocked_403_signature".to_string()),
            403 => Some("blocked_403".to_string()),
            200 if Self::matches(&page.body) => Some("challenge_page_200".to_string()),
            _ => None,
        }
    }
}
