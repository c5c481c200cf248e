//! Fixed window rate limiting per client IP.
//!
//! # Responsibilities
//! - Count requests per client IP inside a fixed window
//! - Reject once the count exceeds the configured maximum
//! - Evict records whose window has elapsed
//!
//! # Design Decisions
//! - Windows reset wholesale; they do not decay
//! - Storage sits behind [`RateLimitStore`] so a shared cache can replace the
//!   in-memory map. [`InMemoryRateLimitStore`] only limits a single process:
//!   several instances behind a load balancer each keep their own counts.
//! - Concurrent hits on one key are serialized by the map's shard lock

use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Per-IP counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Requests seen in the current window.
    pub count: u32,
    /// Window start, milliseconds since the Unix epoch.
    pub window_start: u64,
}

impl RateLimitRecord {
    pub fn fresh(now: u64) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    pub fn is_expired(&self, now: u64, window_ms: u64) -> bool {
        now.saturating_sub(self.window_start) >= window_ms
    }

    /// Apply one request at `now`.
    pub fn advance(&mut self, now: u64, window_ms: u64) {
        if self.is_expired(now, window_ms) {
            *self = Self::fresh(now);
        } else {
            self.count = self.count.saturating_add(1);
        }
    }
}

/// Storage for rate-limit records keyed by client IP.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, ip: &str) -> Option<RateLimitRecord>;

    fn set(&self, ip: &str, record: RateLimitRecord);

    /// Record one request and return the updated record.
    ///
    /// The default goes through `get`/`set` and can lose increments under
    /// concurrent access to the same key; stores that can update in place
    /// should override it.
    fn hit(&self, ip: &str, now: u64, window_ms: u64) -> RateLimitRecord {
        let record = match self.get(ip) {
            Some(mut record) => {
                record.advance(now, window_ms);
                record
            }
            None => RateLimitRecord::fresh(now),
        };
        self.set(ip, record);
        record
    }

    /// Drop records whose window has elapsed. Returns how many were removed.
    fn sweep(&self, _now: u64, _window_ms: u64) -> usize {
        0
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    records: DashMap<String, RateLimitRecord>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn get(&self, ip: &str) -> Option<RateLimitRecord> {
        self.records.get(ip).map(|r| *r.value())
    }

    fn set(&self, ip: &str, record: RateLimitRecord) {
        self.records.insert(ip.to_string(), record);
    }

    fn hit(&self, ip: &str, now: u64, window_ms: u64) -> RateLimitRecord {
        if let Some(mut entry) = self.records.get_mut(ip) {
            entry.advance(now, window_ms);
            return *entry;
        }
        *self
            .records
            .entry(ip.to_string())
            .and_modify(|r| r.advance(now, window_ms))
            .or_insert_with(|| RateLimitRecord::fresh(now))
    }

    fn sweep(&self, now: u64, window_ms: u64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| !r.is_expired(now, window_ms));
        before.saturating_sub(self.records.len())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Fixed window limiter over a pluggable store.
pub struct FixedWindowLimiter {
    store: Box<dyn RateLimitStore>,
}

impl FixedWindowLimiter {
    pub fn new(store: Box<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryRateLimitStore::new()))
    }

    /// Count a request from `ip` at `now`. Returns false when it exceeds the limit.
    pub fn check(&self, ip: &str, now: u64, config: &RateLimitConfig) -> bool {
        let record = self.store.hit(ip, now, config.window_ms);
        record.count <= config.max_requests
    }

    /// Evict expired records and report the remaining table size.
    pub fn sweep(&self, now: u64, config: &RateLimitConfig) -> usize {
        let removed = self.store.sweep(now, config.window_ms);
        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = self.store.len(),
                "Evicted stale rate-limit records"
            );
        }
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }

    pub fn store(&self) -> &dyn RateLimitStore {
        self.store.as_ref()
    }
}
