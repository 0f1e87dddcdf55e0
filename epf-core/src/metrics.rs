//! Metrics collection for the feeder process

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Process-wide metrics collector
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,

    exchanges_total: AtomicU64,
    exchanges_failed: AtomicU64,
    bytes_downloaded: AtomicU64,

    injections_total: AtomicU64,
    bytes_injected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                exchanges_total: AtomicU64::new(0),
                exchanges_failed: AtomicU64::new(0),
                bytes_downloaded: AtomicU64::new(0),
                injections_total: AtomicU64::new(0),
                bytes_injected: AtomicU64::new(0),
            }),
        }
    }

    pub fn record_exchange(&self, bytes: usize) {
        self.inner.exchanges_total.fetch_add(1, Ordering::Relaxed);
        self.inner
            .bytes_downloaded
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_exchange_failure(&self) {
        self.inner.exchanges_total.fetch_add(1, Ordering::Relaxed);
        self.inner.exchanges_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_injection(&self, bytes: usize) {
        self.inner.injections_total.fetch_add(1, Ordering::Relaxed);
        self.inner
            .bytes_injected
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn exchanges_total(&self) -> u64 {
        self.inner.exchanges_total.load(Ordering::Relaxed)
    }

    pub fn exchanges_failed(&self) -> u64 {
        self.inner.exchanges_failed.load(Ordering::Relaxed)
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.inner.bytes_downloaded.load(Ordering::Relaxed)
    }

    pub fn injections_total(&self) -> u64 {
        self.inner.injections_total.load(Ordering::Relaxed)
    }

    pub fn bytes_injected(&self) -> u64 {
        self.inner.bytes_injected.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}
