use std::fmt::Write;
use std::time::Instant;

use super::frame_pipeline::{StageTimings, STAGE_NAMES};

/// Receives the cost of every frame a connection emits.
///
/// Keeps the connection session independent of where the numbers end up.
pub trait PipelineLogger: Send {
    fn frame_completed(&mut self, timings: &StageTimings, faces: usize);

    /// Called once when the connection ends. Default: no-op.
    fn summary(&self) {}
}

/// Running totals for one connection, written to the log on disconnect.
pub struct SessionPipelineLogger {
    label: String,
    connected_at: Instant,
    frames: u64,
    faces: u64,
    stage_totals_ms: [f64; 5],
    slowest_ms: f64,
}

impl SessionPipelineLogger {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            connected_at: Instant::now(),
            frames: 0,
            faces: 0,
            stage_totals_ms: [0.0; 5],
            slowest_ms: 0.0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Mean duration of `stage` over all emitted frames.
    pub fn average_ms(&self, stage: &str) -> Option<f64> {
        if self.frames == 0 {
            return None;
        }
        let index = STAGE_NAMES.iter().position(|name| *name == stage)?;
        Some(self.stage_totals_ms[index] / self.frames as f64)
    }

    pub fn average_faces(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.faces as f64 / self.frames as f64
        }
    }

    /// Longest end-to-end frame seen so far.
    pub fn slowest_ms(&self) -> f64 {
        self.slowest_ms
    }

    /// Multi-line summary, or `None` if the connection never emitted a frame.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }
        let connected_s = self.connected_at.elapsed().as_secs_f64();

        let mut out = format!(
            "{} summary ({} frames, {connected_s:.1}s connected):",
            self.label, self.frames
        );
        for (stage, total_ms) in STAGE_NAMES.iter().zip(self.stage_totals_ms) {
            let avg_ms = total_ms / self.frames as f64;
            let _ = write!(out, "\n  {stage:<10} avg {avg_ms:6.1}ms");
        }
        let _ = write!(
            out,
            "\n  slowest {:.1}ms, {:.2} faces/frame",
            self.slowest_ms,
            self.average_faces()
        );
        if connected_s > 0.0 {
            let _ = write!(
                out,
                "\n  throughput {:.1} fps",
                self.frames as f64 / connected_s
            );
        }
        Some(out)
    }
}

impl PipelineLogger for SessionPipelineLogger {
    fn frame_completed(&mut self, timings: &StageTimings, faces: usize) {
        self.frames += 1;
        self.faces += faces as u64;
        for (total, ms) in self.stage_totals_ms.iter_mut().zip(timings.as_array()) {
            *total += ms;
        }
        self.slowest_ms = self.slowest_ms.max(timings.total_ms());
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
