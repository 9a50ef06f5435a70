// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cache;
pub mod query;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Search-scrape node CLI
#[derive(Parser, Debug)]
#[command(name = "search-scrape-cli")]
#[command(version)]
#[command(about = "Run searches and manage the negative cache from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search, fetch and print pages as Markdown JSON
    Search(query::QueryArgs),

    /// Search only and print the ranked results
    List(query::QueryArgs),

    /// Inspect or maintain the negative cache
    #[command(subcommand)]
    Cache(cache::CacheCommand),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Search(args) => query::run_search(args).await,
        Commands::List(args) => query::run_list(args).await,
        Commands::Cache(command) => cache::run(command).await,
    }
}
