use thiserror::Error;

use crate::shared::face::RawDetection;
use crate::shared::frame::Frame;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("failed to load detector model: {0}")]
    Load(String),
    #[error("detector inference failed: {0}")]
    Inference(String),
    #[error("detector returned malformed output: {0}")]
    MalformedOutput(String),
    #[error("detector is unavailable")]
    Unavailable,
}

/// Domain interface for face detection.
///
/// Receives the preprocessed frame and returns scored boxes in that frame's
/// pixel coordinates, in the model's own order. Implementations may hold
/// non-reentrant state (an inference session), hence `&mut self`; sharing
/// one across connections goes through a `DetectorPool`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError>;
}
