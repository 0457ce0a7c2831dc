use std::sync::atomic::{AtomicU64, Ordering};

/// Streaming counters, shared by the manager and every type manager
#[derive(Debug, Default)]
pub struct StreamStats {
    sync_loads: AtomicU64,
    async_loads: AtomicU64,
    fetch_hits: AtomicU64,
    enabled: AtomicU64,
    collected: AtomicU64,
    leaked: AtomicU64,
    read_failures: AtomicU64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sync_load(&self) {
        self.sync_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_async_load(&self) {
        self.async_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch_hit(&self) {
        self.fetch_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_enabled(&self) {
        self.enabled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_collected(&self, count: usize) {
        self.collected.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_leaked(&self, count: usize) {
        self.leaked.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StreamStatsSnapshot {
        StreamStatsSnapshot {
            sync_loads: self.sync_loads.load(Ordering::Relaxed),
            async_loads: self.async_loads.load(Ordering::Relaxed),
            fetch_hits: self.fetch_hits.load(Ordering::Relaxed),
            enabled: self.enabled.load(Ordering::Relaxed),
            collected: self.collected.load(Ordering::Relaxed),
            leaked: self.leaked.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`StreamStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStatsSnapshot {
    pub sync_loads: u64,
    pub async_loads: u64,
    pub fetch_hits: u64,
    pub enabled: u64,
    pub collected: u64,
    pub leaked: u64,
    pub read_failures: u64,
}

impl StreamStatsSnapshot {
    pub fn total_loads(&self) -> u64 {
        self.sync_loads + self.async_loads
    }

    /// Share of `load()` calls served from resident slots
    pub fn fetch_hit_ratio(&self) -> f32 {
        let total = self.fetch_hits + self.total_loads();
        if total == 0 {
            0.0
        } else {
            self.fetch_hits as f32 / total as f32
        }
    }
}
