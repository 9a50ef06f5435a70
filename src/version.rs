// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the search-scrape node

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-search-scrape-2025-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "duckduckgo-search",
    "negative-cache",
    "domain-concurrency",
    "browser-escalation",
    "bot-detection",
    "markdown-extraction",
    "ssrf-protection",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Search-Scrape Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
