// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Domain concurrency scheduler
//!
//! Admission control for fetches: a global semaphore bounds total in-flight
//! fetches and one semaphore per domain bounds fetches against a single host.
//! A [`SlotLease`] holds one permit of each and returns both when dropped,
//! so timeouts, errors and task cancellation all release capacity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Idle per-domain pools are pruned once the map grows beyond this
const PRUNE_THRESHOLD: usize = 1024;

/// Scoped capacity for one in-flight fetch against one domain
#[derive(Debug)]
pub struct SlotLease {
    // Field order matters: the domain permit is dropped before the global one
    _domain_permit: OwnedSemaphorePermit,
    _global_permit: OwnedSemaphorePermit,
    domain: String,
}

impl SlotLease {
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// Global + per-domain admission control
pub struct DomainScheduler {
    global: Arc<Semaphore>,
    domains: Mutex<HashMap<String, Arc<Semaphore>>>,
    global_limit: usize,
    per_domain_limit: usize,
    slow_acquire_warn: Duration,
}

impl DomainScheduler {
    /// Create a scheduler
    ///
    /// # Arguments
    /// * `global_limit` - Maximum concurrent fetches process-wide (min 1)
    /// * `per_domain_limit` - Maximum concurrent fetches per domain (min 1)
    pub fn new(global_limit: usize, per_domain_limit: usize) -> Self {
        let global_limit = global_limit.max(1);
        Self {
            global: Arc::new(Semaphore::new(global_limit)),
            domains: Mutex::new(HashMap::new()),
            global_limit,
            per_domain_limit: per_domain_limit.max(1),
            slow_acquire_warn: Duration::from_secs(30),
        }
    }

    /// Log acquisitions that wait longer than `threshold`
    pub fn with_slow_acquire_warning(mut self, threshold: Duration) -> Self {
        self.slow_acquire_warn = threshold;
        self
    }

    /// Wait for a global slot, then a slot for `domain`
    ///
    /// Never fails; it only waits. Cancelling the returned future while it
    /// waits releases anything already acquired.
    pub async fn acquire(&self, domain: &str) -> SlotLease {
        let started = Instant::now();

        // The semaphores are owned by the scheduler and never closed
        let global_permit = Arc::clone(&self.global)
            .acquire_owned()
            .await
            .expect("scheduler semaphores are never closed");
        let domain_permit = self
            .domain_semaphore(domain)
            .acquire_owned()
            .await
            .expect("scheduler semaphores are never closed");

        let waited = started.elapsed();
        if waited >= self.slow_acquire_warn {
            warn!(
                "Slot for {} took {}ms to acquire; limits may be too low (global={}, per_domain={})",
                domain,
                waited.as_millis(),
                self.global_limit,
                self.per_domain_limit
            );
        } else {
            debug!("Slot acquired for {} after {}ms", domain, waited.as_millis());
        }

        SlotLease {
            _domain_permit: domain_permit,
            _global_permit: global_permit,
            domain: domain.to_string(),
        }
    }

    /// Return a lease's slots; equivalent to dropping it
    pub fn release(&self, lease: SlotLease) {
        debug!("Slot released for {}", lease.domain);
        drop(lease);
    }

    fn domain_semaphore(&self, domain: &str) -> Arc<Semaphore> {
        let mut domains = self
            .domains
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if domains.len() >= PRUNE_THRESHOLD && !domains.contains_key(domain) {
            let limit = self.per_domain_limit;
            domains.retain(|_, sem| {
                Arc::strong_count(sem) > 1 || sem.available_permits() < limit
            });
        }

        Arc::clone(
            domains
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_domain_limit))),
        )
    }

    /// Fetches currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.global_limit - self.global.available_permits()
    }

    /// Fetches currently holding a slot for `domain`
    pub fn in_flight_for(&self, domain: &str) -> usize {
        let domains = self
            .domains
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        domains
            .get(domain)
            .map_or(0, |sem| self.per_domain_limit - sem.available_permits())
    }

    /// Number of domains with a per-domain pool
    pub fn tracked_domains(&self) -> usize {
        self.domains
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn global_limit(&self) -> usize {
        self.global_limit
    }

    pub fn per_domain_limit(&self) -> usize {
        self.per_domain_limit
    }
}
