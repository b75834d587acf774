use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Resolution, SupportChain, SupportRequest, ValidationSupport};

/// Memoizes every answer of the wrapped chain, `NotFound` included.
///
/// Entries are never evicted or invalidated: definitions are treated as
/// immutable for the lifetime of the cache. That only holds because every
/// provider answers the same request the same way. A provider whose answers
/// change over time would be served stale data from here.
///
/// Lookups are lock-free. Two threads missing on the same request at once
/// both compute the answer; the later insert wins, and both answers are
/// identical anyway.
pub struct CachingValidationSupport {
    chain: SupportChain,
    entries: papaya::HashMap<SupportRequest, Resolution>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

impl CachingValidationSupport {
    pub fn new(chain: SupportChain) -> Self {
        Self {
            chain,
            entries: papaya::HashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn chain(&self) -> &SupportChain {
        &self.chain
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

impl ValidationSupport for CachingValidationSupport {
    fn resolve(&self, request: &SupportRequest) -> Resolution {
        if let Some(cached) = self.entries.pin().get(request).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return cached;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        // Nested lookups made by providers come back through the cache.
        let resolution = self.chain.resolve_with_root(request, self);
        tracing::debug!(
            "Cache miss for {} ({})",
            request,
            if resolution.is_found() { "resolved" } else { "not found" }
        );

        self.entries
            .pin()
            .insert(request.clone(), resolution.clone());
        resolution
    }
}

impl fmt::Debug for CachingValidationSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingValidationSupport")
            .field("chain", &self.chain)
            .field("stats", &self.stats())
            .finish()
    }
}
