// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search provider trait definition

use async_trait::async_trait;

use super::types::{SearchError, SearchQuery, SearchResult};

/// Trait for implementing search providers
///
/// Providers return raw ranked results. Normalization, de-duplication and
/// re-ranking happen in [`SearchService`](super::SearchService).
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Perform a web search
    ///
    /// # Arguments
    /// * `query` - The query, result count and provider filters
    ///
    /// # Returns
    /// Ranked results (may contain more than `query.k` entries) or an error
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError>;

    /// Get the provider name for logging
    fn name(&self) -> &'static str;
}
