//! Per-camera counters
//!
//! Mirrored to the global `metrics` recorder by the production loop; these
//! atomics are what `SharedCamera::stats` and the tests read.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of a single camera, shared with its production thread
#[derive(Debug, Default)]
pub struct CameraMetrics {
    frames_published: AtomicU64,
    frames_reserved: AtomicU64,
    frames_delivered: AtomicU64,
    transient_errors: AtomicU64,
    side_task_runs: AtomicU64,
    side_task_failures: AtomicU64,
    consumers_reaped: AtomicU64,
    producer_starts: AtomicU64,
    producer_stops: AtomicU64,
    startup_failures: AtomicU64,
}

impl CameraMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc_frames_published(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_frames_reserved(&self) {
        self.frames_reserved.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_frames_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_transient_errors(&self) {
        self.transient_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_side_task_runs(&self) {
        self.side_task_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_side_task_failures(&self) {
        self.side_task_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_consumers_reaped(&self, count: usize) {
        self.consumers_reaped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn inc_producer_starts(&self) {
        self.producer_starts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_producer_stops(&self) {
        self.producer_stops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_startup_failures(&self) {
        self.startup_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CameraStats {
        CameraStats {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_reserved: self.frames_reserved.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            transient_errors: self.transient_errors.load(Ordering::Relaxed),
            side_task_runs: self.side_task_runs.load(Ordering::Relaxed),
            side_task_failures: self.side_task_failures.load(Ordering::Relaxed),
            consumers_reaped: self.consumers_reaped.load(Ordering::Relaxed),
            producer_starts: self.producer_starts.load(Ordering::Relaxed),
            producer_stops: self.producer_stops.load(Ordering::Relaxed),
            startup_failures: self.startup_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of camera counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraStats {
    /// Frames stored and published, re-served payloads included
    pub frames_published: u64,
    /// Publishes that repeated the last payload after a transient error
    pub frames_reserved: u64,
    /// Frames handed out by `get_frame`
    pub frames_delivered: u64,
    pub transient_errors: u64,
    /// Side task invocations, failed ones included
    pub side_task_runs: u64,
    pub side_task_failures: u64,
    pub consumers_reaped: u64,
    pub producer_starts: u64,
    pub producer_stops: u64,
    pub startup_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_increments() {
        let metrics = CameraMetrics::new();
        metrics.inc_frames_published();
        metrics.inc_frames_published();
        metrics.add_consumers_reaped(3);
        metrics.inc_side_task_failures();

        let stats = metrics.snapshot();
        assert_eq!(stats.frames_published, 2);
        assert_eq!(stats.consumers_reaped, 3);
        assert_eq!(stats.side_task_failures, 1);
        assert_eq!(stats.producer_starts, 0);
    }
}
