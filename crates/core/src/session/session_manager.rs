use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::pipeline::frame_pipeline::FramePipeline;
use crate::shared::clock::{Clock, MonotonicClock};

use super::connection_session::ConnectionSession;
use super::rate_limiter::RateLimiter;
use super::transport::{ConnectionId, Transport};

/// Creates a `ConnectionSession` per connection, all sharing one pipeline,
/// one transport and one clock. Holds no per-connection state itself.
pub struct SessionManager {
    pipeline: Arc<FramePipeline>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    active: Arc<AtomicUsize>,
}

impl SessionManager {
    pub fn new(
        pipeline: Arc<FramePipeline>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pipeline,
            transport,
            clock,
            limiter: RateLimiter::default(),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Manager on the process-wide monotonic clock.
    pub fn with_monotonic_clock(pipeline: Arc<FramePipeline>, transport: Arc<dyn Transport>) -> Self {
        Self::new(pipeline, transport, Arc::new(MonotonicClock::new()))
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn connect(&self, id: ConnectionId) -> ConnectionSession {
        log::info!("{id} connected");
        ConnectionSession::new(
            id,
            self.limiter,
            self.pipeline.clone(),
            self.transport.clone(),
            self.clock.clone(),
            self.active.clone(),
        )
    }

    /// Sessions created and not yet dropped.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}
