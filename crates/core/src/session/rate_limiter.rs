use crate::shared::constants::MIN_FRAME_INTERVAL_MS;

/// Gating state for one connection. Never shared between connections.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConnectionState {
    last_admitted_ms: Option<f64>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_admitted_ms(&self) -> Option<f64> {
        self.last_admitted_ms
    }
}

/// Fixed-interval frame gate.
///
/// A frame is admitted when the connection has never admitted one, or when
/// at least `min_interval_ms` has passed since the last admission. Only an
/// admission moves the reference point; rejected frames change nothing, and
/// idle time does not bank extra admissions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimiter {
    min_interval_ms: f64,
}

impl RateLimiter {
    /// Gate allowing at most `fps` frames per second (minimum 1).
    pub fn new(fps: u32) -> Self {
        Self::with_interval(1000.0 / fps.max(1) as f64)
    }

    pub fn with_interval(min_interval_ms: f64) -> Self {
        Self { min_interval_ms }
    }

    pub fn min_interval_ms(&self) -> f64 {
        self.min_interval_ms
    }

    pub fn admit(&self, state: &mut ConnectionState, now_ms: f64) -> bool {
        let admitted = match state.last_admitted_ms {
            None => true,
            Some(last) => now_ms - last >= self.min_interval_ms,
        };
        if admitted {
            state.last_admitted_ms = Some(now_ms);
        }
        admitted
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_interval(MIN_FRAME_INTERVAL_MS)
    }
}
