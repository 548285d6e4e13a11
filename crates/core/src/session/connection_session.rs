use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::codec::domain::data_uri::FramePayload;
use crate::pipeline::frame_pipeline::{FramePipeline, PipelineError, PipelineResult};
use crate::pipeline::pipeline_logger::{PipelineLogger, SessionPipelineLogger};
use crate::shared::clock::Clock;

use super::rate_limiter::{ConnectionState, RateLimiter};
use super::transport::{ConnectionId, OutboundMessage, Transport};

/// Running counters for one connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub received: u64,
    pub admitted: u64,
    pub dropped: u64,
    pub failed: u64,
    pub emitted: u64,
}

/// What became of one inbound frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Rejected by the rate limiter; nothing was sent.
    Dropped,
    /// Admitted but a stage failed; nothing was sent.
    Failed,
    /// Both outbound events were sent.
    Emitted { faces: usize },
}

/// A frame that passed the rate limiter and still has to run the pipeline.
///
/// `Send + 'static`, so the caller may process it on any thread and hand the
/// result back to `ConnectionSession::complete`.
pub struct AdmittedFrame {
    pipeline: Arc<FramePipeline>,
    payload: FramePayload,
}

impl AdmittedFrame {
    pub fn process(self) -> Result<PipelineResult, PipelineError> {
        self.pipeline.process(self.payload)
    }
}

/// Frame handling for one live connection.
///
/// Owns the connection's gating state outright, so admission decisions need
/// no locking and cannot be affected by other connections. Any pipeline
/// failure stops here: it is logged and counted, nothing is sent, and the
/// connection carries on.
pub struct ConnectionSession {
    id: ConnectionId,
    state: ConnectionState,
    limiter: RateLimiter,
    pipeline: Arc<FramePipeline>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    logger: Box<dyn PipelineLogger>,
    stats: SessionStats,
    active: Arc<AtomicUsize>,
}

impl ConnectionSession {
    pub(crate) fn new(
        id: ConnectionId,
        limiter: RateLimiter,
        pipeline: Arc<FramePipeline>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        active: Arc<AtomicUsize>,
    ) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            id,
            state: ConnectionState::new(),
            limiter,
            pipeline,
            transport,
            clock,
            logger: Box::new(SessionPipelineLogger::new(id.to_string())),
            stats: SessionStats::default(),
            active,
        }
    }

    /// Replace the per-connection logger (defaults to a summary logger).
    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Consult the rate limiter at the current time.
    ///
    /// The slot is taken on admission, before anything is decoded, so an
    /// admitted frame that later fails still counts against the interval.
    pub fn admit(&mut self, payload: FramePayload) -> Option<AdmittedFrame> {
        self.stats.received += 1;
        let now_ms = self.clock.now_ms();
        if !self.limiter.admit(&mut self.state, now_ms) {
            self.stats.dropped += 1;
            log::trace!("{}: frame dropped by rate limiter", self.id);
            return None;
        }
        self.stats.admitted += 1;
        Some(AdmittedFrame {
            pipeline: self.pipeline.clone(),
            payload,
        })
    }

    /// Count a frame turned away because this connection already has as
    /// many frames in flight as it may. The rate limiter is not consulted,
    /// so the next frame is judged as if this one never arrived.
    pub fn drop_busy(&mut self) -> FrameOutcome {
        self.stats.received += 1;
        self.stats.dropped += 1;
        log::trace!("{}: frame dropped, pipeline busy", self.id);
        FrameOutcome::Dropped
    }

    /// Emit a finished frame to this connection, or log why it failed.
    pub fn complete(&mut self, result: Result<PipelineResult, PipelineError>) -> FrameOutcome {
        match result {
            Ok(result) => {
                let faces = result.faces.len();
                self.record(&result);
                self.transport
                    .send(self.id, OutboundMessage::CameraFrame(result.frame_uri()));
                self.transport
                    .send(self.id, OutboundMessage::Faces(result.faces));
                self.stats.emitted += 1;
                FrameOutcome::Emitted { faces }
            }
            Err(e) => {
                self.stats.failed += 1;
                log::error!("{}: frame abandoned: {e}", self.id);
                FrameOutcome::Failed
            }
        }
    }

    /// Admit, process and emit one frame on the calling thread.
    pub fn handle_frame(&mut self, payload: FramePayload) -> FrameOutcome {
        match self.admit(payload) {
            Some(frame) => {
                let result = frame.process();
                self.complete(result)
            }
            None => FrameOutcome::Dropped,
        }
    }

    /// End the connection. Gating state goes with it; results of frames
    /// still in flight are never passed back here.
    pub fn disconnect(self) -> SessionStats {
        self.stats
    }

    fn record(&mut self, result: &PipelineResult) {
        let t = &result.timings;
        self.logger.frame_completed(t, result.faces.len());
        log::debug!(
            "{}: {} face(s) in {:.1}ms (decode {:.1}, preprocess {:.1}, detect {:.1}, annotate {:.1}, encode {:.1})",
            self.id,
            result.faces.len(),
            t.total_ms(),
            t.decode_ms,
            t.preprocess_ms,
            t.detect_ms,
            t.annotate_ms,
            t.encode_ms
        );
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        let s = self.stats;
        log::info!(
            "{} disconnected: {} received, {} admitted, {} dropped, {} failed, {} emitted",
            self.id,
            s.received,
            s.admitted,
            s.dropped,
            s.failed,
            s.emitted
        );
        self.logger.summary();
    }
}
