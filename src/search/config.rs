// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for web search functionality

use std::env;
use std::time::Duration;

/// Configuration for the search step
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Outbound provider requests allowed per minute
    pub rate_limit_per_minute: u32,
    /// Provider request timeout in seconds
    pub request_timeout_secs: u64,
    /// Region used when a request does not name one
    pub default_region: String,
}

impl SearchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rate_limit_per_minute: env::var("SEARCH_RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_per_minute),
            request_timeout_secs: env::var("SEARCH_TIMEOUT_S")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            default_region: env::var("SEARCH_DEFAULT_REGION")
                .unwrap_or(defaults.default_region),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit_per_minute == 0 {
            return Err("Rate limit must be greater than 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("Search timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 30,
            request_timeout_secs: 15,
            default_region: "jp-jp".to_string(),
        }
    }
}
