use crate::shared::face::AcceptedFace;
use crate::shared::frame::Frame;

/// Domain interface for marking accepted faces on the source frame.
///
/// Implementations draw in place (`&mut Frame`); face coordinates are in the
/// frame's own pixel space and may reach past its edges.
pub trait FrameAnnotator: Send + Sync {
    fn annotate(&self, frame: &mut Frame, faces: &[AcceptedFace]);
}
