//! Lifecycle counters for the instance registry.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Registry-wide lifecycle metrics
#[derive(Debug, Default)]
pub struct LifecycleMetrics {
    pub activations: AtomicU64,
    pub activation_failures: AtomicU64,
    pub deactivations: AtomicU64,
    pub deactivation_failures: AtomicU64,
    pub idle_collections: AtomicU64,
    pub invocations: AtomicU64,
    pub invocation_failures: AtomicU64,
    pub total_activation_time_ns: AtomicU64,
}

impl LifecycleMetrics {
    pub fn record_activation(&self, duration: Duration, success: bool) {
        if success {
            self.activations.fetch_add(1, Ordering::Relaxed);
            self.total_activation_time_ns
                .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        } else {
            self.activation_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_deactivation(&self, success: bool) {
        self.deactivations.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.deactivation_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_idle_collection(&self) {
        self.idle_collections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invocation(&self, success: bool) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.invocation_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn avg_activation_time_ns(&self) -> f64 {
        let count = self.activations.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_activation_time_ns.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    pub fn snapshot(&self) -> LifecycleStats {
        LifecycleStats {
            activations: self.activations.load(Ordering::Relaxed),
            activation_failures: self.activation_failures.load(Ordering::Relaxed),
            deactivations: self.deactivations.load(Ordering::Relaxed),
            deactivation_failures: self.deactivation_failures.load(Ordering::Relaxed),
            idle_collections: self.idle_collections.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            invocation_failures: self.invocation_failures.load(Ordering::Relaxed),
            avg_activation_time_ns: self.avg_activation_time_ns(),
        }
    }
}

/// Point-in-time copy of [`LifecycleMetrics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleStats {
    pub activations: u64,
    pub activation_failures: u64,
    pub deactivations: u64,
    pub deactivation_failures: u64,
    pub idle_collections: u64,
    pub invocations: u64,
    pub invocation_failures: u64,
    pub avg_activation_time_ns: f64,
}
