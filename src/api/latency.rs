//! In-memory latency histograms for outbound provider calls.
//! Fetchers record, the /stats/latency route reads.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// One histogram of call durations, stored in microseconds.
pub struct LatencyStats {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl LatencyStats {
    /// Tracks 1us to 100s, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 100_000_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().clamp(1, 100_000_000) as u64;
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us);
        }
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let Ok(h) = self.inner.lock() else {
            return LatencySnapshot::default();
        };
        if h.len() == 0 {
            return LatencySnapshot::default();
        }
        LatencySnapshot {
            samples: h.len(),
            p50_ms: Some(us_to_ms(h.value_at_quantile(0.5))),
            p95_ms: Some(us_to_ms(h.value_at_quantile(0.95))),
            p99_ms: Some(us_to_ms(h.value_at_quantile(0.99))),
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

fn us_to_ms(us: u64) -> f64 {
    us as f64 / 1000.0
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencySnapshot {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

/// Per-provider histograms.
#[derive(Default)]
pub struct ProviderLatency {
    pub comparables: LatencyStats,
    pub listings: LatencyStats,
}

impl ProviderLatency {
    pub fn new() -> Self {
        Self::default()
    }
}
