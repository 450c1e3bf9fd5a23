//! Outcome metrics.
//!
//! A single monotonic counter of restarts performed, rendered in the
//! Prometheus text exposition format for the `/metrics` endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters incremented by the remediation engine.
#[derive(Debug, Default)]
pub struct MetricsSink {
    restarts_total: AtomicU64,
}

impl MetricsSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful restart.
    pub fn record_restart(&self) {
        self.restarts_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Current restart count.
    pub fn restarts_total(&self) -> u64 {
        self.restarts_total.load(Ordering::Relaxed)
    }

    /// Render all counters in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# HELP restarts_total Containers restarted by the remediation engine.\n");
        out.push_str("# TYPE restarts_total counter\n");
        out.push_str(&format!("restarts_total {}\n", self.restarts_total()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_zero() {
        let sink = MetricsSink::new();
        let output = sink.render();
        assert!(output.contains("# HELP restarts_total"));
        assert!(output.contains("# TYPE restarts_total counter"));
        assert!(output.contains("restarts_total 0\n"));
    }

    #[test]
    fn test_counter_is_monotonic() {
        let sink = MetricsSink::new();
        sink.record_restart();
        sink.record_restart();
        sink.record_restart();
        assert_eq!(sink.restarts_total(), 3);
        assert!(sink.render().contains("restarts_total 3\n"));
    }
}
