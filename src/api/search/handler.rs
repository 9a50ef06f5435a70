// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search and list endpoint handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::SearchApiRequest;
use super::response::{ListApiResponse, SearchApiResponse};
use crate::api::errors::ApiError;
use crate::api::server::AppState;

fn parse_request(
    payload: Result<Json<SearchApiRequest>, JsonRejection>,
) -> Result<SearchApiRequest, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected request body: {}", rejection.body_text());
        ApiError::InvalidRequest(rejection.body_text())
    })?;

    if let Err(message) = request.validate() {
        warn!("Search validation failed: {}", message);
        return Err(ApiError::ValidationError {
            field: request.invalid_field().to_string(),
            message,
        });
    }
    Ok(request)
}

/// POST /search - Search, fetch and convert results to Markdown
///
/// # Request
/// - `q`: Search query (required, max 500 chars)
/// - `k`: Number of results (1-50, default 5)
/// - `region`, `language`, `time_range`: Provider filters
/// - `enable_browser`: Allow headless browser escalation (default true)
///
/// # Response
/// - `query`, `k`
/// - `docs`: `{url, title, markdown}` in search-rank order; pages that
///   could not be fetched are omitted
///
/// # Errors
/// - 400 Bad Request: Malformed body or invalid parameters
/// - 502 Bad Gateway: The search provider failed
pub async fn search_handler(
    State(state): State<AppState>,
    payload: Result<Json<SearchApiRequest>, JsonRejection>,
) -> Result<Json<SearchApiResponse>, ApiError> {
    let request = parse_request(payload)?;
    debug!("Search request: {:?}", request.q);

    let started = Instant::now();
    let docs = state
        .pipeline
        .search(&request.to_query(), request.enable_browser)
        .await
        .map_err(|e| {
            warn!("Search failed for '{}': {}", request.q, e);
            ApiError::from(e)
        })?;

    info!(
        "Search complete: {} docs for '{}' in {}ms",
        docs.len(),
        request.q,
        started.elapsed().as_millis()
    );

    Ok(Json(SearchApiResponse::new(request.q, request.k, docs)))
}

/// POST /list - Search only, no page fetching
pub async fn list_handler(
    State(state): State<AppState>,
    payload: Result<Json<SearchApiRequest>, JsonRejection>,
) -> Result<Json<ListApiResponse>, ApiError> {
    let request = parse_request(payload)?;
    debug!("List request: {:?}", request.q);

    let results = state
        .pipeline
        .list(&request.to_query())
        .await
        .map_err(|e| {
            warn!("List failed for '{}': {}", request.q, e);
            ApiError::from(e)
        })?;

    Ok(Json(ListApiResponse::new(request.q, request.k, results)))
}
