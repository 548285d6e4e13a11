use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of "now" for rate limiting, in milliseconds.
///
/// Only differences between readings are meaningful.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Monotonic wall time measured from construction.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for deterministic timing in tests and replays.
pub struct ManualClock {
    now_bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now_bits: AtomicU64::new(start_ms.to_bits()),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now_bits.store(now_ms.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.set(self.now_ms() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::SeqCst))
    }
}
