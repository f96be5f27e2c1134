//! Relay counters, exposed as JSON on `/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Default)]
pub struct RelayMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_error: AtomicU64,

    pub gate_denied: AtomicU64,
    pub auth_rejected: AtomicU64,
    pub rate_limit_rejected: AtomicU64,

    // Ledger outcomes
    pub admissions_accepted: AtomicU64,
    pub admissions_rejected: AtomicU64,

    pub notifications_sent: AtomicU64,
    pub notifications_failed: AtomicU64,

    // Latency tracking (sum and count)
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, success: bool, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gate_denial(&self) {
        self.gate_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_rejection(&self) {
        self.auth_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit_rejection(&self) {
        self.rate_limit_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admission(&self, accepted: bool) {
        if accepted {
            self.admissions_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.admissions_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_notification(&self, delivered: bool) {
        if delivered {
            self.notifications_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.notifications_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export as JSON. The ledger size is owned by the ledger, so the caller
    /// passes it in.
    pub fn to_json(&self, ledger_size: usize) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
                "error": self.requests_error.load(Ordering::Relaxed),
            },
            "access": {
                "denied": self.gate_denied.load(Ordering::Relaxed),
                "unauthorized": self.auth_rejected.load(Ordering::Relaxed),
                "rate_limited": self.rate_limit_rejected.load(Ordering::Relaxed),
            },
            "admissions": {
                "accepted": self.admissions_accepted.load(Ordering::Relaxed),
                "rejected": self.admissions_rejected.load(Ordering::Relaxed),
                "ledger_size": ledger_size,
            },
            "notifications": {
                "sent": self.notifications_sent.load(Ordering::Relaxed),
                "failed": self.notifications_failed.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<RelayMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<RelayMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, success: bool) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(success, latency_ms);
    }
}
