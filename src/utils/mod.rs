// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod urls;

pub use urls::{dedupe_urls, domain_of, normalize_url};
