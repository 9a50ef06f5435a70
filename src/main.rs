// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use search_scrape_node::{
    api::{start_server, ApiConfig, AppState},
    scrape::{ScrapeConfig, SearchScrapePipeline},
    search::SearchConfig,
    version,
};
use std::{env, sync::Arc};
use tokio::signal;
use tracing::{info, warn};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    println!("\n⏹️  Shutting down...");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting {}...\n", version::get_version_string());
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!();

    let search_config = SearchConfig::from_env();
    let scrape_config = ScrapeConfig::from_env();
    let api_config = ApiConfig::from_env();
    api_config.validate().map_err(|e| anyhow!(e))?;

    println!("🔧 Configuration:");
    println!(
        "   Concurrency: global={}, per_domain={}",
        scrape_config.global_concurrency, scrape_config.per_domain_concurrency
    );
    println!(
        "   Negative cache: {} (ttl {}s)",
        scrape_config.negative_cache_dir.display(),
        scrape_config.negative_cache_ttl.as_secs()
    );
    println!(
        "   Fetch timeout: {}s, min markdown: {} chars, browser: {}",
        scrape_config.fetch_timeout.as_secs_f64(),
        scrape_config.min_markdown_chars,
        scrape_config.browser_enabled
    );
    println!();

    let pipeline = Arc::new(SearchScrapePipeline::from_config(
        search_config,
        &scrape_config,
    )?);

    // Periodically drop expired negative cache records
    let cache = Arc::clone(pipeline.cache());
    let evict_every = scrape_config.negative_cache_evict_interval;
    let eviction_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(evict_every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = cache.evict_expired().await;
            if removed > 0 {
                info!("Negative cache eviction removed {} records", removed);
            }
        }
    });

    println!("🌐 API listening on http://{}", api_config.listen_addr());
    start_server(&api_config, AppState::new(pipeline), shutdown_signal()).await?;

    eviction_handle.abort();
    println!("👋 Goodbye!");
    Ok(())
}
