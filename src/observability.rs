use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Counters for workflow and progress activity
#[derive(Debug, Default)]
pub struct MonitorMetrics {
    pub transitions_applied: AtomicU64,
    pub transitions_rejected: AtomicU64,
    pub milestone_mutations: AtomicU64,
    pub recomputations: AtomicU64,
    pub noop_recomputations: AtomicU64,
    pub weight_warnings: AtomicU64,
    pub concurrency_conflicts: AtomicU64,
    pub delays_detected: AtomicU64,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_transition(&self) {
        self.transitions_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_transition(&self) {
        self.transitions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_milestone_mutation(&self) {
        self.milestone_mutations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recompute(&self, written: bool) {
        if written {
            self.recomputations.fetch_add(1, Ordering::Relaxed);
        } else {
            self.noop_recomputations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_weight_warning(&self) {
        self.weight_warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.concurrency_conflicts.fetch_add(1, Ordering::Relaxed);
        debug!("Optimistic version check failed");
    }

    pub fn record_delays(&self, count: usize) {
        self.delays_detected.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> MonitorStats {
        MonitorStats {
            transitions_applied: self.transitions_applied.load(Ordering::Relaxed),
            transitions_rejected: self.transitions_rejected.load(Ordering::Relaxed),
            milestone_mutations: self.milestone_mutations.load(Ordering::Relaxed),
            recomputations: self.recomputations.load(Ordering::Relaxed),
            noop_recomputations: self.noop_recomputations.load(Ordering::Relaxed),
            weight_warnings: self.weight_warnings.load(Ordering::Relaxed),
            concurrency_conflicts: self.concurrency_conflicts.load(Ordering::Relaxed),
            delays_detected: self.delays_detected.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Monitor metrics: transitions={}, rejected={}, milestone_changes={}, recomputes={}, noop_recomputes={}, weight_warnings={}, conflicts={}, delays={}",
            stats.transitions_applied,
            stats.transitions_rejected,
            stats.milestone_mutations,
            stats.recomputations,
            stats.noop_recomputations,
            stats.weight_warnings,
            stats.concurrency_conflicts,
            stats.delays_detected
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStats {
    pub transitions_applied: u64,
    pub transitions_rejected: u64,
    pub milestone_mutations: u64,
    pub recomputations: u64,
    pub noop_recomputations: u64,
    pub weight_warnings: u64,
    pub concurrency_conflicts: u64,
    pub delays_detected: u64,
}

/// Global metrics instance
static MONITOR_METRICS: std::sync::LazyLock<MonitorMetrics> =
    std::sync::LazyLock::new(MonitorMetrics::new);

pub fn monitor_metrics() -> &'static MonitorMetrics {
    &MONITOR_METRICS
}

/// Time an operation and log its duration on finish
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        debug!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
