use crate::shared::constants::{CONFIDENCE_THRESHOLD, MIN_FACE_SIZE};
use crate::shared::face::{AcceptedFace, RawDetection};

/// Turns raw detector output into accepted faces in source-frame coordinates.
///
/// Per detection, in input order:
/// 1. reject if `confidence < confidence_threshold`;
/// 2. truncate the box to integer processed-frame pixels and reject if
///    either side is shorter than `min_size`;
/// 3. multiply each coordinate by its scale factor and truncate.
///
/// The size test runs before rescaling, so which boxes pass does not depend
/// on the source aspect ratio. No overlap suppression is done.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionFilter {
    confidence_threshold: f32,
    min_size: i32,
}

impl DetectionFilter {
    pub fn new(confidence_threshold: f32, min_size: i32) -> Self {
        Self {
            confidence_threshold,
            min_size,
        }
    }

    pub fn filter(
        &self,
        detections: &[RawDetection],
        scale_x: f64,
        scale_y: f64,
    ) -> Vec<AcceptedFace> {
        detections
            .iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .filter_map(|d| {
                let x1 = d.bbox.x1 as i32;
                let y1 = d.bbox.y1 as i32;
                let x2 = d.bbox.x2 as i32;
                let y2 = d.bbox.y2 as i32;
                // Saturated coordinates must not overflow the subtraction
                let min_size = i64::from(self.min_size);
                if i64::from(x2) - i64::from(x1) < min_size
                    || i64::from(y2) - i64::from(y1) < min_size
                {
                    return None;
                }

                let face = AcceptedFace::new(
                    rescale(x1, scale_x),
                    rescale(y1, scale_y),
                    rescale(x2, scale_x),
                    rescale(y2, scale_y),
                );
                // Only reachable when the source is far smaller than the processed size
                (face.width() > 0 && face.height() > 0).then_some(face)
            })
            .collect()
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new(CONFIDENCE_THRESHOLD, MIN_FACE_SIZE)
    }
}

fn rescale(v: i32, scale: f64) -> i32 {
    (v as f64 * scale) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::face::BoundingBox;
    use rstest::rstest;

    fn det(confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> RawDetection {
        RawDetection::new(confidence, BoundingBox::new(x1, y1, x2, y2))
    }

    // ── Confidence ───────────────────────────────────────────────────

    #[rstest]
    #[case::at_threshold(0.8, 1)]
    #[case::above(0.95, 1)]
    #[case::just_below(0.79, 0)]
    #[case::zero(0.0, 0)]
    #[case::nan(f32::NAN, 0)]
    fn test_confidence_boundary(#[case] confidence: f32, #[case] expected: usize) {
        let faces = DetectionFilter::default().filter(
            &[det(confidence, 10.0, 10.0, 60.0, 60.0)],
            1.0,
            1.0,
        );
        assert_eq!(faces.len(), expected);
    }

    // ── Size ─────────────────────────────────────────────────────────

    #[rstest]
    #[case::width_exact(30.0, 50.0, 1)]
    #[case::width_short(29.0, 50.0, 0)]
    #[case::height_exact(50.0, 30.0, 1)]
    #[case::height_short(50.0, 29.0, 0)]
    fn test_size_boundary(#[case] w: f32, #[case] h: f32, #[case] expected: usize) {
        let faces = DetectionFilter::default().filter(
            &[det(0.9, 100.0, 100.0, 100.0 + w, 100.0 + h)],
            1.0,
            1.0,
        );
        assert_eq!(faces.len(), expected);
    }

    #[test]
    fn test_size_measured_after_truncation() {
        // 10.9 → 10, 40.2 → 40: width 30 once truncated
        let faces =
            DetectionFilter::default().filter(&[det(0.9, 10.9, 10.0, 40.2, 60.0)], 1.0, 1.0);
        assert_eq!(faces, vec![AcceptedFace::new(10, 10, 40, 60)]);
    }

    #[test]
    fn test_size_filter_runs_before_rescale() {
        let filter = DetectionFilter::default();
        // 29 px wide in processed space, 116 px once scaled: still rejected
        assert!(filter
            .filter(&[det(0.9, 0.0, 0.0, 29.0, 40.0)], 4.0, 4.0)
            .is_empty());
        // 30 px wide in processed space, 15 px once scaled: still accepted
        assert_eq!(
            filter.filter(&[det(0.9, 0.0, 0.0, 30.0, 40.0)], 0.5, 0.5),
            vec![AcceptedFace::new(0, 0, 15, 20)]
        );
    }

    // ── Rescaling ────────────────────────────────────────────────────

    #[test]
    fn test_rescale_to_source_coordinates() {
        // 640x480 source, 320x240 processed
        let faces =
            DetectionFilter::default().filter(&[det(0.9, 10.0, 20.0, 60.0, 80.0)], 2.0, 2.0);
        assert_eq!(faces, vec![AcceptedFace::new(20, 40, 120, 160)]);
    }

    #[test]
    fn test_rescale_truncates_fractional_results() {
        // sx = 1.5, sy = 1.25: 11*1.5 = 16.5, 33*1.25 = 41.25, 47*1.5 = 70.5, 71*1.25 = 88.75
        let faces =
            DetectionFilter::default().filter(&[det(0.9, 11.0, 33.0, 47.0, 71.0)], 1.5, 1.25);
        assert_eq!(faces, vec![AcceptedFace::new(16, 41, 70, 88)]);
    }

    #[test]
    fn test_rescale_matches_floor_for_non_negative_boxes() {
        let (sx, sy) = (1920.0 / 320.0, 1080.0 / 240.0);
        let faces =
            DetectionFilter::default().filter(&[det(0.9, 13.0, 17.0, 77.0, 95.0)], sx, sy);
        let expected = AcceptedFace::new(
            (13.0 * sx).floor() as i32,
            (17.0 * sy).floor() as i32,
            (77.0 * sx).floor() as i32,
            (95.0 * sy).floor() as i32,
        );
        assert_eq!(faces, vec![expected]);
    }

    #[test]
    fn test_degenerate_rescaled_box_dropped() {
        // 10x8 source: scale 1/32, a 30 px box collapses to zero width
        let faces = DetectionFilter::default().filter(
            &[det(0.9, 0.0, 0.0, 30.0, 30.0)],
            10.0 / 320.0,
            8.0 / 240.0,
        );
        assert!(faces.is_empty());
    }

    // ── Ordering ─────────────────────────────────────────────────────

    #[test]
    fn test_preserves_detector_order_without_suppression() {
        let detections = vec![
            det(0.85, 200.0, 100.0, 260.0, 170.0),
            det(0.5, 0.0, 0.0, 100.0, 100.0), // rejected
            det(0.99, 10.0, 10.0, 60.0, 60.0),
            det(0.9, 12.0, 12.0, 62.0, 62.0), // heavy overlap, kept
        ];
        let faces = DetectionFilter::default().filter(&detections, 1.0, 1.0);
        assert_eq!(
            faces,
            vec![
                AcceptedFace::new(200, 100, 260, 170),
                AcceptedFace::new(10, 10, 60, 60),
                AcceptedFace::new(12, 12, 62, 62),
            ]
        );
    }

    // ── Extreme output ───────────────────────────────────────────────

    #[rstest]
    #[case::saturating_wide(-3.0e9, 0.0, 3.0e9, 60.0, 1)]
    #[case::saturating_tall(0.0, -3.0e9, 60.0, 3.0e9, 1)]
    #[case::inverted_extremes(3.0e9, 0.0, -3.0e9, 60.0, 0)]
    #[case::infinite(f32::NEG_INFINITY, 0.0, f32::INFINITY, 60.0, 1)]
    #[case::nan_corner(f32::NAN, 0.0, 60.0, 60.0, 1)]
    fn test_extreme_boxes_do_not_overflow(
        #[case] x1: f32,
        #[case] y1: f32,
        #[case] x2: f32,
        #[case] y2: f32,
        #[case] expected: usize,
    ) {
        let faces = DetectionFilter::default().filter(&[det(0.9, x1, y1, x2, y2)], 2.0, 2.0);
        assert_eq!(faces.len(), expected);
        assert!(faces.iter().all(|f| f.width() > 0 && f.height() > 0));
    }

    #[test]
    fn test_empty_input() {
        assert!(DetectionFilter::default().filter(&[], 2.0, 2.0).is_empty());
    }

    #[test]
    fn test_every_face_is_labelled_zero() {
        let faces =
            DetectionFilter::default().filter(&[det(0.9, 0.0, 0.0, 40.0, 40.0)], 1.0, 1.0);
        assert!(faces.iter().all(|f| f.label == 0));
    }
}
