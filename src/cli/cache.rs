// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use std::path::PathBuf;

use crate::scrape::{NegativeCache, ScrapeConfig};

/// Negative cache maintenance commands
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Count valid, expired and corrupt records
    Stats {
        /// Cache directory (defaults to NEG_CACHE_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Remove expired and corrupt records
    Purge {
        /// Cache directory (defaults to NEG_CACHE_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Show whether a URL is currently negative-cached
    Check {
        /// URL to look up (normalized before lookup)
        url: String,

        /// Cache directory (defaults to NEG_CACHE_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn open_cache(dir: Option<PathBuf>) -> Result<NegativeCache> {
    let dir = dir.unwrap_or_else(|| ScrapeConfig::from_env().negative_cache_dir);
    Ok(NegativeCache::open(dir)?)
}

pub async fn run(command: CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Stats { dir } => {
            let cache = open_cache(dir)?;
            let stats = cache.stats().await;
            println!("📂 Cache directory: {}", cache.dir().display());
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        CacheCommand::Purge { dir } => {
            let cache = open_cache(dir)?;
            let removed = cache.evict_expired().await;
            println!("🧹 Removed {} expired or corrupt records", removed);
        }
        CacheCommand::Check { url, dir } => {
            let cache = open_cache(dir)?;
            let key = NegativeCache::normalized_key(&url);
            match cache.lookup_at(&url, Utc::now()).await {
                Some(entry) => {
                    let expires = Utc
                        .timestamp_millis_opt(entry.expires_at_ms())
                        .single()
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default();
                    println!("⛔ {} is negative-cached", key);
                    println!("   kind:    {}", entry.kind);
                    println!("   reason:  {}", entry.reason);
                    if let Some(status) = entry.http_status {
                        println!("   status:  {}", status);
                    }
                    println!("   expires: {}", expires);
                }
                None => println!("✅ {} is not negative-cached", key),
            }
        }
    }
    Ok(())
}
