// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for page fetching, scheduling and the negative cache

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the scrape pipeline
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Maximum fetches in flight process-wide (default: 8)
    pub global_concurrency: usize,
    /// Maximum fetches in flight per domain (default: 2)
    pub per_domain_concurrency: usize,
    /// Directory holding negative cache records (default: .negcache)
    pub negative_cache_dir: PathBuf,
    /// How long a negative outcome is honored (default: 30 minutes)
    pub negative_cache_ttl: Duration,
    /// Background eviction period (default: 10 minutes)
    pub negative_cache_evict_interval: Duration,
    /// Hard timeout per fetch attempt (default: 20s)
    pub fetch_timeout: Duration,
    /// Extracted Markdown below this length triggers escalation (default: 400)
    pub min_markdown_chars: usize,
    /// Slot waits longer than this are logged (default: 30s)
    pub slow_acquire_warn: Duration,
    /// Allow the headless browser fetch path (default: true)
    pub browser_enabled: bool,
    /// Explicit Chromium binary; auto-detected when unset
    pub chrome_path: Option<PathBuf>,
    /// Allow fetching localhost, IP literals and private addresses (default: false)
    pub allow_private_hosts: bool,
    /// Response bodies are truncated past this many bytes (default: 5 MiB)
    pub max_body_bytes: usize,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<f64>(name).and_then(|v| Duration::try_from_secs_f64(v).ok())
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl ScrapeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            global_concurrency: env_parse("GLOBAL_CONCURRENCY")
                .unwrap_or(defaults.global_concurrency),
            per_domain_concurrency: env_parse("PER_DOMAIN_CONCURRENCY")
                .unwrap_or(defaults.per_domain_concurrency),
            negative_cache_dir: env::var("NEG_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.negative_cache_dir),
            negative_cache_ttl: env_secs("NEG_CACHE_TTL_S").unwrap_or(defaults.negative_cache_ttl),
            negative_cache_evict_interval: env_secs("NEG_CACHE_EVICT_INTERVAL_S")
                .unwrap_or(defaults.negative_cache_evict_interval),
            fetch_timeout: env_secs("FETCH_TIMEOUT_S").unwrap_or(defaults.fetch_timeout),
            min_markdown_chars: env_parse("MIN_MARKDOWN_CHARS")
                .unwrap_or(defaults.min_markdown_chars),
            slow_acquire_warn: env_secs("SLOW_ACQUIRE_WARN_S")
                .unwrap_or(defaults.slow_acquire_warn),
            browser_enabled: env_flag("BROWSER_ENABLED").unwrap_or(defaults.browser_enabled),
            chrome_path: env::var("CHROME_PATH").ok().map(PathBuf::from),
            allow_private_hosts: env_flag("ALLOW_PRIVATE_HOSTS")
                .unwrap_or(defaults.allow_private_hosts),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.global_concurrency == 0 {
            return Err("GLOBAL_CONCURRENCY must be at least 1".to_string());
        }
        if self.per_domain_concurrency == 0 {
            return Err("PER_DOMAIN_CONCURRENCY must be at least 1".to_string());
        }
        if self.per_domain_concurrency > self.global_concurrency {
            return Err(
                "PER_DOMAIN_CONCURRENCY cannot exceed GLOBAL_CONCURRENCY".to_string(),
            );
        }
        if self.fetch_timeout.is_zero() {
            return Err("FETCH_TIMEOUT_S must be greater than 0".to_string());
        }
        if self.negative_cache_ttl.is_zero() {
            return Err("NEG_CACHE_TTL_S must be greater than 0".to_string());
        }
        if self.max_body_bytes == 0 {
            return Err("MAX_BODY_BYTES must be greater than 0".to_string());
        }
        if self.negative_cache_evict_interval.is_zero() {
            return Err("NEG_CACHE_EVICT_INTERVAL_S must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            global_concurrency: 8,
            per_domain_concurrency: 2,
            negative_cache_dir: PathBuf::from(".negcache"),
            negative_cache_ttl: Duration::from_secs(1800),
            negative_cache_evict_interval: Duration::from_secs(600),
            fetch_timeout: Duration::from_secs(20),
            min_markdown_chars: 400,
            slow_acquire_warn: Duration::from_secs(30),
            browser_enabled: true,
            chrome_path: None,
            allow_private_hosts: false,
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}
