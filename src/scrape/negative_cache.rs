// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Persisted negative outcome cache
//!
//! One JSON record per normalized URL, named by the SHA-256 of the URL.
//! Records carry their own TTL; `lookup` re-checks it on every call so
//! eviction promptness never affects correctness.
//!
//! The cache is an optimization: read failures are treated as "no entry"
//! and write failures are logged and swallowed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::OutcomeKind;
use crate::utils::normalize_url;

const RECORD_EXT: &str = "json";
const TMP_EXT: &str = "tmp";
/// Temp files older than this are leftovers from interrupted writes
const STALE_TMP_AGE: Duration = Duration::from_secs(60);

/// Negative cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt cache record {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A persisted negative outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized URL the entry was recorded for
    pub url: String,
    pub kind: OutcomeKind,
    /// Short machine-readable reason (e.g. "http_429", "timeout")
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub recorded_at: DateTime<Utc>,
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
}

impl CacheEntry {
    pub fn new(url: &str, kind: OutcomeKind, reason: impl Into<String>, ttl: Duration) -> Self {
        Self {
            url: NegativeCache::normalized_key(url),
            kind,
            reason: reason.into(),
            http_status: None,
            recorded_at: Utc::now(),
            ttl_ms: ttl.as_millis().min(u128::from(u64::MAX)) as u64,
        }
    }

    pub fn with_http_status(mut self, status: Option<u16>) -> Self {
        self.http_status = status;
        self
    }

    /// Milliseconds since the epoch at which the entry stops being honored
    pub fn expires_at_ms(&self) -> i64 {
        self.recorded_at
            .timestamp_millis()
            .saturating_add(i64::try_from(self.ttl_ms).unwrap_or(i64::MAX))
    }

    /// Valid iff `now < recorded_at + ttl`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() < self.expires_at_ms()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeCacheStats {
    /// Records on disk
    pub total: usize,
    /// Records currently honored
    pub valid: usize,
    /// Expired records not yet evicted
    pub expired: usize,
    /// Records that could not be parsed
    pub corrupt: usize,
}

/// Directory-backed negative outcome cache
#[derive(Debug, Clone)]
pub struct NegativeCache {
    dir: PathBuf,
}

enum Record {
    Missing,
    Entry(CacheEntry),
}

impl NegativeCache {
    /// Open (and create if needed) a cache directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Key string a URL is stored under: its normalized form, or the trimmed input
    pub fn normalized_key(url: &str) -> String {
        normalize_url(url).unwrap_or_else(|| url.trim().to_string())
    }

    /// Deterministic record file name stem for a URL
    pub fn key_for(url: &str) -> String {
        hex::encode(Sha256::digest(Self::normalized_key(url).as_bytes()))
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", Self::key_for(url), RECORD_EXT))
    }

    /// Cached outcome kind for `url`, if an unexpired entry exists
    pub async fn lookup(&self, url: &str) -> Option<OutcomeKind> {
        self.lookup_at(url, Utc::now()).await.map(|e| e.kind)
    }

    /// Entry for `url` that is valid at `now`
    pub async fn lookup_at(&self, url: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let path = self.path_for(url);
        match read_record(&path).await {
            Ok(Record::Entry(entry)) if entry.is_valid_at(now) => Some(entry),
            Ok(Record::Entry(_)) | Ok(Record::Missing) => None,
            Err(e) => {
                warn!("Negative cache lookup failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Record a negative outcome with `recorded_at = now`
    pub async fn record(&self, url: &str, kind: OutcomeKind, ttl: Duration) {
        self.insert(CacheEntry::new(url, kind, kind.to_string(), ttl))
            .await;
    }

    /// Record a negative outcome with its reason and HTTP status
    pub async fn record_outcome(
        &self,
        url: &str,
        kind: OutcomeKind,
        reason: &str,
        http_status: Option<u16>,
        ttl: Duration,
    ) {
        self.insert(CacheEntry::new(url, kind, reason, ttl).with_http_status(http_status))
            .await;
    }

    /// Write an entry, overwriting any previous one for the same URL
    pub async fn insert(&self, entry: CacheEntry) {
        if let Err(e) = self.try_insert(&entry).await {
            warn!("Negative cache write failed for {}: {}", entry.url, e);
        } else {
            debug!(
                "Negative cache: {} -> {} ({}ms)",
                entry.url, entry.kind, entry.ttl_ms
            );
        }
    }

    async fn try_insert(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let path = self.path_for(&entry.url);
        let json = serde_json::to_vec(entry).map_err(|e| CacheError::Corrupt {
            path: path.clone(),
            source: e,
        })?;

        // Write-then-rename keeps readers from seeing partial records
        let tmp = self.dir.join(format!(
            ".{}.{}.{}",
            Self::key_for(&entry.url),
            Uuid::new_v4().simple(),
            TMP_EXT
        ));

        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(CacheError::io(&tmp, e));
            }
            // Directory removed underneath us; recreate once
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| CacheError::io(&self.dir, e))?;
            tokio::fs::write(&tmp, &json)
                .await
                .map_err(|e| CacheError::io(&tmp, e))?;
        }

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::io(&path, e));
        }
        Ok(())
    }

    /// Remove expired and corrupt records; returns how many were removed
    pub async fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now()).await
    }

    pub async fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Negative cache eviction skipped: {}", CacheError::io(&self.dir, e));
                return 0;
            }
        };

        loop {
            let item = match entries.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    warn!("Negative cache eviction stopped: {}", CacheError::io(&self.dir, e));
                    break;
                }
            };
            let path = item.path();

            let stale = match path.extension().and_then(|e| e.to_str()) {
                Some(RECORD_EXT) => match read_record(&path).await {
                    Ok(Record::Entry(entry)) => !entry.is_valid_at(now),
                    Ok(Record::Missing) => false,
                    Err(CacheError::Corrupt { .. }) => true,
                    Err(e) => {
                        warn!("Negative cache eviction read failed: {}", e);
                        false
                    }
                },
                Some(TMP_EXT) => is_stale_tmp(&item).await,
                _ => false,
            };

            if stale {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!("Negative cache eviction failed: {}", CacheError::io(&path, e)),
                }
            }
        }

        if removed > 0 {
            debug!("Negative cache evicted {} records", removed);
        }
        removed
    }

    /// Count records by state
    pub async fn stats(&self) -> NegativeCacheStats {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> NegativeCacheStats {
        let mut stats = NegativeCacheStats::default();
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return stats;
        };

        while let Ok(Some(item)) = entries.next_entry().await {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            stats.total += 1;
            match read_record(&path).await {
                Ok(Record::Entry(entry)) if entry.is_valid_at(now) => stats.valid += 1,
                Ok(Record::Entry(_)) => stats.expired += 1,
                Ok(Record::Missing) => stats.total -= 1,
                Err(_) => stats.corrupt += 1,
            }
        }
        stats
    }
}

async fn read_record(path: &Path) -> Result<Record, CacheError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Record::Missing),
        Err(e) => return Err(CacheError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Record::Entry)
        .map_err(|e| CacheError::Corrupt {
            path: path.to_path_buf(),
            source: e,
        })
}

async fn is_stale_tmp(item: &tokio::fs::DirEntry) -> bool {
    item.metadata()
        .await
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map_or(false, |age| age > STALE_TMP_AGE)
}
