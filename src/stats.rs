//! Process-wide running counters, concurrently updated by every operator.
//! Monotonically non-decreasing; only the terminator (Fusion, at shutdown)
//! reads them.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Statistics {
    ticks: AtomicU64,
    detected: AtomicU64,
    tracked: AtomicU64,
    landmarks: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_detected(&self, n: u64) {
        self.detected.fetch_add(n, Ordering::SeqCst);
    }

    pub fn add_tracked(&self, n: u64) {
        self.tracked.fetch_add(n, Ordering::SeqCst);
    }

    pub fn add_landmark(&self) {
        self.landmarks.fetch_add(1, Ordering::SeqCst);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn detected(&self) -> u64 {
        self.detected.load(Ordering::SeqCst)
    }

    pub fn tracked(&self) -> u64 {
        self.tracked.load(Ordering::SeqCst)
    }

    pub fn landmarks(&self) -> u64 {
        self.landmarks.load(Ordering::SeqCst)
    }
}
