use log::debug;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::report::DashboardReport;
use crate::types::CacheKey;

/// Bounded memo of finished reports, least recently used evicted first
pub struct ReportCache {
    entries: LruCache<CacheKey, Arc<DashboardReport>>,
    hits: u64,
    misses: u64,
}

impl ReportCache {
    /// Create a cache holding at most `capacity` reports (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Retrieve a report, marking it as recently used
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<DashboardReport>> {
        match self.entries.get(key) {
            Some(report) => {
                self.hits += 1;
                debug!("report cache hit ({:016x})", key.dataset);
                Some(Arc::clone(report))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a report, evicting the least recently used one when full
    pub fn store(&mut self, key: CacheKey, report: Arc<DashboardReport>) {
        if let Some((evicted, _)) = self.entries.push(key, report) {
            if evicted != key {
                debug!("report cache evicted ({:016x})", evicted.dataset);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(8)
    }
}
