// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use tracing::info;

use crate::api::{ListApiResponse, SearchApiResponse};
use crate::scrape::{ScrapeConfig, SearchScrapePipeline};
use crate::search::{SearchConfig, SearchOptions, SearchQuery, TimeRange};

/// Arguments for the search and list commands
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Search query
    #[arg(long)]
    pub q: String,

    /// Number of results (1-50)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..=50))]
    pub k: u16,

    /// DuckDuckGo region code
    #[arg(long, default_value = "jp-jp")]
    pub region: String,

    /// Language hint
    #[arg(long)]
    pub language: Option<String>,

    /// Time range: any, d, w, m, y
    #[arg(long, default_value = "any")]
    pub time_range: TimeRange,

    /// Never escalate to the headless browser
    #[arg(long)]
    pub no_browser: bool,
}

impl QueryArgs {
    fn to_query(&self) -> Result<SearchQuery> {
        if self.q.trim().is_empty() {
            return Err(anyhow!("query cannot be empty"));
        }
        Ok(
            SearchQuery::new(self.q.trim(), self.k as usize).with_options(SearchOptions {
                region: Some(self.region.clone()),
                language: self.language.clone(),
                time_range: self.time_range,
            }),
        )
    }
}

fn build_pipeline() -> Result<SearchScrapePipeline> {
    let pipeline = SearchScrapePipeline::from_config(SearchConfig::from_env(), &ScrapeConfig::from_env())?;
    Ok(pipeline)
}

/// Search, scrape and print `{query, k, docs}` as JSON
pub async fn run_search(args: QueryArgs) -> Result<()> {
    let query = args.to_query()?;
    let pipeline = build_pipeline()?;

    let docs = pipeline.search(&query, !args.no_browser).await?;
    info!("{} docs for '{}'", docs.len(), query.q);

    let response = SearchApiResponse::new(query.q, query.k, docs);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Search only and print `{query, k, docs}` as JSON
pub async fn run_list(args: QueryArgs) -> Result<()> {
    let query = args.to_query()?;
    let pipeline = build_pipeline()?;

    let results = pipeline.list(&query).await?;
    let response = ListApiResponse::new(query.q, query.k, results);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
