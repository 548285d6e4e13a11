use image::{ImageBuffer, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::shared::constants::ANNOTATION_COLOR;
use crate::shared::face::AcceptedFace;
use crate::shared::frame::Frame;

/// Draws a one-pixel rectangle outline around each face.
///
/// Corners are inclusive: the outline covers columns `x1..=x2` on rows `y1`
/// and `y2`, and rows `y1..=y2` on columns `x1` and `x2`. Edges that fall
/// outside the frame are skipped; the visible remainder is still drawn.
pub struct OutlineAnnotator {
    color: Rgb<u8>,
}

impl OutlineAnnotator {
    pub fn new(color: [u8; 3]) -> Self {
        Self { color: Rgb(color) }
    }
}

impl Default for OutlineAnnotator {
    fn default() -> Self {
        Self::new(ANNOTATION_COLOR)
    }
}

impl FrameAnnotator for OutlineAnnotator {
    fn annotate(&self, frame: &mut Frame, faces: &[AcceptedFace]) {
        if frame.is_empty() || frame.channels() != 3 || faces.is_empty() {
            return;
        }
        let (width, height) = (frame.width(), frame.height());
        // Borrow the frame's buffer in place; drawing writes straight into it
        let Some(mut img) =
            ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(width, height, frame.data_mut())
        else {
            return;
        };

        for face in faces {
            if let Some(rect) = outline_rect(face, width, height) {
                draw_hollow_rect_mut(&mut img, rect, self.color);
            }
        }
    }
}

/// Inclusive face box as a `Rect`, or `None` if it cannot touch the frame.
///
/// Coordinates are pulled in to one pixel beyond each border first. An edge
/// past the border stays past it, so the drawn pixels are unchanged, but
/// extreme coordinates can no longer overflow the rectangle arithmetic.
fn outline_rect(face: &AcceptedFace, width: u32, height: u32) -> Option<Rect> {
    let (fw, fh) = (i64::from(width), i64::from(height));
    let x1 = i64::from(face.x1).max(-1);
    let y1 = i64::from(face.y1).max(-1);
    let x2 = i64::from(face.x2).min(fw);
    let y2 = i64::from(face.y2).min(fh);
    if x2 < 0 || y2 < 0 || x1 >= fw || y1 >= fh || x2 < x1 || y2 < y1 {
        return None;
    }
    Some(Rect::at(x1 as i32, y1 as i32).of_size((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: [u8; 3] = [0, 255, 0];
    const GRAY: [u8; 3] = [128, 128, 128];

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = (y * frame.width() + x) as usize * 3;
        let px = &frame.data()[i..i + 3];
        [px[0], px[1], px[2]]
    }

    fn green_count(frame: &Frame) -> usize {
        frame.data().chunks(3).filter(|px| *px == GREEN).count()
    }

    #[test]
    fn test_draws_one_pixel_outline() {
        let mut frame = Frame::filled(20, 20, GRAY);
        OutlineAnnotator::default().annotate(&mut frame, &[AcceptedFace::new(2, 3, 10, 12)]);

        // Corners and edges
        assert_eq!(pixel(&frame, 2, 3), GREEN);
        assert_eq!(pixel(&frame, 10, 12), GREEN);
        assert_eq!(pixel(&frame, 6, 3), GREEN);
        assert_eq!(pixel(&frame, 2, 8), GREEN);
        assert_eq!(pixel(&frame, 10, 8), GREEN);
        assert_eq!(pixel(&frame, 6, 12), GREEN);

        // Interior and just outside untouched
        assert_eq!(pixel(&frame, 6, 8), GRAY);
        assert_eq!(pixel(&frame, 3, 4), GRAY);
        assert_eq!(pixel(&frame, 1, 3), GRAY);
        assert_eq!(pixel(&frame, 11, 12), GRAY);
        assert_eq!(pixel(&frame, 6, 13), GRAY);

        // Perimeter of a 9x10 inclusive box
        assert_eq!(green_count(&frame), 2 * 9 + 2 * 10 - 4);
    }

    #[test]
    fn test_no_faces_leaves_frame_unchanged() {
        let mut frame = Frame::filled(16, 16, GRAY);
        let before = frame.clone();
        OutlineAnnotator::default().annotate(&mut frame, &[]);
        assert_eq!(frame, before);
    }

    #[test]
    fn test_partially_outside_is_clipped() {
        let mut frame = Frame::filled(10, 10, GRAY);
        OutlineAnnotator::default().annotate(&mut frame, &[AcceptedFace::new(5, 5, 30, 30)]);

        // Top and left edges visible up to the border
        assert_eq!(pixel(&frame, 9, 5), GREEN);
        assert_eq!(pixel(&frame, 5, 9), GREEN);
        // Right and bottom edges fall outside the frame
        assert_eq!(pixel(&frame, 9, 9), GRAY);
        assert_eq!(green_count(&frame), 5 + 5 - 1);
    }

    #[test]
    fn test_negative_origin_is_clipped() {
        let mut frame = Frame::filled(10, 10, GRAY);
        OutlineAnnotator::default().annotate(&mut frame, &[AcceptedFace::new(-4, -4, 5, 5)]);
        assert_eq!(pixel(&frame, 0, 5), GREEN);
        assert_eq!(pixel(&frame, 5, 0), GREEN);
        assert_eq!(pixel(&frame, 0, 0), GRAY);
        assert_eq!(green_count(&frame), 6 + 6 - 1);
    }

    #[test]
    fn test_entirely_outside_draws_nothing() {
        let mut frame = Frame::filled(10, 10, GRAY);
        let before = frame.clone();
        OutlineAnnotator::default().annotate(
            &mut frame,
            &[AcceptedFace::new(20, 20, 60, 60), AcceptedFace::new(-50, -50, -10, -10)],
        );
        assert_eq!(frame, before);
    }

    #[test]
    fn test_overlapping_faces_both_drawn() {
        let mut frame = Frame::filled(40, 40, GRAY);
        OutlineAnnotator::default().annotate(
            &mut frame,
            &[AcceptedFace::new(0, 0, 20, 20), AcceptedFace::new(10, 10, 30, 30)],
        );
        assert_eq!(pixel(&frame, 0, 0), GREEN);
        assert_eq!(pixel(&frame, 30, 30), GREEN);
        assert_eq!(pixel(&frame, 20, 10), GREEN);
    }

    #[test]
    fn test_custom_color() {
        let mut frame = Frame::filled(10, 10, GRAY);
        OutlineAnnotator::new([255, 0, 0]).annotate(&mut frame, &[AcceptedFace::new(1, 1, 8, 8)]);
        assert_eq!(pixel(&frame, 1, 1), [255, 0, 0]);
    }

    #[test]
    fn test_extreme_coordinates_are_clipped() {
        let mut frame = Frame::filled(10, 10, GRAY);
        OutlineAnnotator::default().annotate(
            &mut frame,
            &[AcceptedFace::new(i32::MIN, 2, i32::MAX, 7)],
        );
        // Only the horizontal edges cross the frame
        assert_eq!(pixel(&frame, 0, 2), GREEN);
        assert_eq!(pixel(&frame, 9, 7), GREEN);
        assert_eq!(pixel(&frame, 0, 4), GRAY);
        assert_eq!(green_count(&frame), 2 * 10);
    }

    #[test]
    fn test_inverted_box_draws_nothing() {
        let mut frame = Frame::filled(10, 10, GRAY);
        let before = frame.clone();
        OutlineAnnotator::default().annotate(&mut frame, &[AcceptedFace::new(8, 8, 2, 2)]);
        assert_eq!(frame, before);
    }

    #[test]
    fn test_gray_frame_left_alone() {
        let mut frame = Frame::new(vec![7u8; 16], 4, 4, 1);
        let before = frame.clone();
        OutlineAnnotator::default().annotate(&mut frame, &[AcceptedFace::new(0, 0, 3, 3)]);
        assert_eq!(frame, before);
    }
}
