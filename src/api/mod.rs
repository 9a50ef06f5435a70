// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod search;
pub mod server;

pub use errors::{ApiError, ErrorResponse};
pub use search::{
    list_handler, search_handler, ListApiResponse, ListDoc, SearchApiRequest, SearchApiResponse,
};
pub use server::{create_router, start_server, ApiConfig, AppState, HealthResponse};
