//! Shared health state for the /health endpoint.
//! Updated by the provider clients and the DB writer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Shared health counters. Updated by pipeline components, read by API.
#[derive(Default)]
pub struct HealthState {
    /// Provider calls that returned usable data.
    pub upstream_successes: AtomicU64,
    /// Provider calls that timed out, failed or returned an unreadable body.
    pub upstream_failures: AtomicU64,
    /// Unix seconds of the last successful provider call (0 = never).
    pub last_upstream_ok_at: AtomicU64,
    /// Approximate count of events queued for the DB writer.
    pub write_queue_pending: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_upstream_ok(&self) {
        self.upstream_successes.fetch_add(1, Ordering::Relaxed);
        self.last_upstream_ok_at.store(now_secs(), Ordering::Relaxed);
    }

    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_write_queue_pending(&self) {
        self.write_queue_pending.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_write_queue_pending(&self) {
        // Saturating: a writer draining an event queued before startup must not wrap.
        let _ = self
            .write_queue_pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    pub fn upstream_successes(&self) -> u64 {
        self.upstream_successes.load(Ordering::Relaxed)
    }

    pub fn upstream_failures(&self) -> u64 {
        self.upstream_failures.load(Ordering::Relaxed)
    }

    pub fn last_upstream_ok_at(&self) -> u64 {
        self.last_upstream_ok_at.load(Ordering::Relaxed)
    }

    pub fn write_queue_pending(&self) -> u64 {
        self.write_queue_pending.load(Ordering::Relaxed)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
