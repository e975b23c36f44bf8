//! Wall-clock timing for segmentation, diffing and solver runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Stopwatch started on construction.
#[derive(Debug)]
pub struct Timer {
    label: &'static str,
    started: Instant,
}

impl Timer {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn elapsed_s(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Consume the timer, returning the elapsed seconds.
    pub fn stop(self) -> f64 {
        self.elapsed_s()
    }
}

/// Lock-free tally of durations recorded from any thread.
///
/// Durations are stored in whole microseconds.
#[derive(Debug, Default)]
pub struct AccumulatingTimer {
    total_us: AtomicU64,
    max_us: AtomicU64,
    count: AtomicU64,
}

/// Point-in-time copy of an [`AccumulatingTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimingSummary {
    pub count: u64,
    pub total_s: f64,
    pub mean_s: f64,
    pub max_s: f64,
}

fn to_us(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1e6).round() as u64
}

fn to_s(micros: u64) -> f64 {
    micros as f64 / 1e6
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            total_us: AtomicU64::new(0),
            max_us: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn record(&self, seconds: f64) {
        let micros = to_us(seconds);
        self.total_us.fetch_add(micros, Ordering::Relaxed);
        self.max_us.fetch_max(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn total_seconds(&self) -> f64 {
        to_s(self.total_us.load(Ordering::Relaxed))
    }

    pub fn summary(&self) -> TimingSummary {
        let count = self.count();
        let total_s = self.total_seconds();
        TimingSummary {
            count,
            total_s,
            mean_s: if count == 0 { 0.0 } else { total_s / count as f64 },
            max_s: to_s(self.max_us.load(Ordering::Relaxed)),
        }
    }
}
