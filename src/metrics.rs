//! Production instrumentation for the synchronizer.
//!
//! A small set of atomic counters, always compiled in, tracking sample
//! ingestion and synchronization outcomes. Minimal overhead, safe to read
//! from any thread even though [`crate::clock::Clock`] itself is only ever
//! driven from the replica's single event-loop thread.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics instance for the synchronizer.
pub static METRICS: Metrics = Metrics::new();

/// Atomic counters for clock synchronization activity.
#[derive(Debug)]
pub struct Metrics {
    samples_learned_total: AtomicU64,
    samples_rejected_total: AtomicU64,
    synchronizations_succeeded_total: AtomicU64,
    window_resets_total: AtomicU64,
    epoch_resets_total: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            samples_learned_total: AtomicU64::new(0),
            samples_rejected_total: AtomicU64::new(0),
            synchronizations_succeeded_total: AtomicU64::new(0),
            window_resets_total: AtomicU64::new(0),
            epoch_resets_total: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_sample_learned(&self) {
        self.samples_learned_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sample_rejected(&self) {
        self.samples_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_synchronization_succeeded(&self) {
        self.synchronizations_succeeded_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_window_reset(&self) {
        self.window_resets_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_epoch_reset(&self) {
        self.epoch_resets_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples_learned_total: self.samples_learned_total.load(Ordering::Relaxed),
            samples_rejected_total: self.samples_rejected_total.load(Ordering::Relaxed),
            synchronizations_succeeded_total: self
                .synchronizations_succeeded_total
                .load(Ordering::Relaxed),
            window_resets_total: self.window_resets_total.load(Ordering::Relaxed),
            epoch_resets_total: self.epoch_resets_total.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time read of [`Metrics`]' counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub samples_learned_total: u64,
    pub samples_rejected_total: u64,
    pub synchronizations_succeeded_total: u64,
    pub window_resets_total: u64,
    pub epoch_resets_total: u64,
}

#[cfg(feature = "prometheus-metrics")]
mod prometheus_export {
    use super::MetricsSnapshot;
    use prometheus::{IntCounter, Registry};

    /// Registers the synchronizer's counters on a Prometheus [`Registry`].
    ///
    /// Call once at startup; the returned handle's `update` method should be
    /// polled periodically (e.g. alongside `tick()`) to push the latest
    /// [`MetricsSnapshot`] into the registered counters, since `Metrics`
    /// itself uses plain atomics rather than `prometheus` types directly.
    pub struct PrometheusExporter {
        samples_learned: IntCounter,
        samples_rejected: IntCounter,
        synchronizations_succeeded: IntCounter,
        window_resets: IntCounter,
        epoch_resets: IntCounter,
        last: MetricsSnapshot,
    }

    impl PrometheusExporter {
        /// Registers gauges on `registry` and returns an exporter seeded
        /// from an all-zero snapshot.
        pub fn register(registry: &Registry) -> prometheus::Result<Self> {
            let samples_learned =
                IntCounter::new("clock_samples_learned_total", "Accepted clock samples")?;
            let samples_rejected =
                IntCounter::new("clock_samples_rejected_total", "Rejected clock samples")?;
            let synchronizations_succeeded = IntCounter::new(
                "clock_synchronizations_succeeded_total",
                "Successful window-to-current promotions",
            )?;
            let window_resets =
                IntCounter::new("clock_window_resets_total", "Window epoch timeouts")?;
            let epoch_resets =
                IntCounter::new("clock_epoch_resets_total", "Current epoch timeouts")?;

            registry.register(Box::new(samples_learned.clone()))?;
            registry.register(Box::new(samples_rejected.clone()))?;
            registry.register(Box::new(synchronizations_succeeded.clone()))?;
            registry.register(Box::new(window_resets.clone()))?;
            registry.register(Box::new(epoch_resets.clone()))?;

            Ok(Self {
                samples_learned,
                samples_rejected,
                synchronizations_succeeded,
                window_resets,
                epoch_resets,
                last: MetricsSnapshot {
                    samples_learned_total: 0,
                    samples_rejected_total: 0,
                    synchronizations_succeeded_total: 0,
                    window_resets_total: 0,
                    epoch_resets_total: 0,
                },
            })
        }

        /// Advances each Prometheus counter by the delta since the last
        /// call. `prometheus::Counter` only grows, so deltas against the
        /// last observed snapshot are used rather than absolute values.
        pub fn update(&mut self, snapshot: MetricsSnapshot) {
            self.samples_learned.inc_by(
                snapshot.samples_learned_total - self.last.samples_learned_total,
            );
            self.samples_rejected.inc_by(
                snapshot.samples_rejected_total - self.last.samples_rejected_total,
            );
            self.synchronizations_succeeded.inc_by(
                snapshot.synchronizations_succeeded_total
                    - self.last.synchronizations_succeeded_total,
            );
            self.window_resets
                .inc_by(snapshot.window_resets_total - self.last.window_resets_total);
            self.epoch_resets
                .inc_by(snapshot.epoch_resets_total - self.last.epoch_resets_total);
            self.last = snapshot;
        }
    }
}

#[cfg(feature = "prometheus-metrics")]
pub use prometheus_export::PrometheusExporter;
