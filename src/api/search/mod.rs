// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search API endpoints
//!
//! Provides `/search` (search + scrape) and `/list` (search only).

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{list_handler, search_handler};
pub use request::SearchApiRequest;
pub use response::{ListApiResponse, ListDoc, SearchApiResponse};
