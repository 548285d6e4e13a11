/// Single-shot face detector (ResNet-10 SSD) using ONNX Runtime via `ort`.
///
/// Takes the preprocessed frame, builds a mean-subtracted BGR blob at the
/// model's square input size, and maps the normalized `[1, 1, N, 7]` output
/// back into that frame's pixel space. Thresholding is left to the
/// `DetectionFilter`.
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};

use super::execution_provider::{accelerator_name, preferred_execution_providers};
use crate::detection::domain::face_detector::{DetectorError, FaceDetector};
use crate::shared::face::{BoundingBox, RawDetection};
use crate::shared::frame::Frame;

/// Fallback input resolution when the model's input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 300;

/// Per-channel means subtracted from the blob, in B, G, R order.
const MEAN_BGR: [f32; 3] = [104.0, 177.0, 123.0];

/// Values per detection row: image id, class id, confidence, x1, y1, x2, y2.
const ROW_LEN: usize = 7;

pub struct OnnxSsdDetector {
    session: ort::session::Session,
    input_size: u32,
}

impl OnnxSsdDetector {
    /// Load an SSD ONNX model.
    ///
    /// The input resolution is read from the model's NCHW input shape and
    /// falls back to 300 when that shape is dynamic.
    pub fn new(model_path: &Path) -> Result<Self, DetectorError> {
        let session = ort::session::Session::builder()
            .map_err(|e| DetectorError::Load(e.to_string()))?
            .with_execution_providers(preferred_execution_providers())
            .map_err(|e| DetectorError::Load(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| DetectorError::Load(e.to_string()))?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!(
            "Loaded SSD model {} (input {input_size}x{input_size}, {})",
            model_path.display(),
            accelerator_name()
        );
        Ok(Self {
            session,
            input_size,
        })
    }
}

impl FaceDetector for OnnxSsdDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError> {
        let blob = build_blob(frame, self.input_size)?;
        let input_value = ort::value::Tensor::from_array(blob)
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(DetectorError::MalformedOutput(
                "model produced no outputs".into(),
            ));
        }

        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectorError::MalformedOutput(e.to_string()))?;
        let data = tensor.as_slice().ok_or_else(|| {
            DetectorError::MalformedOutput("output tensor is not contiguous".into())
        })?;

        parse_detections(data, tensor.shape(), frame.width(), frame.height())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize to `size × size` and lay out as NCHW float32 in BGR order with the
/// channel means subtracted. Pixel values are not rescaled.
fn build_blob(frame: &Frame, size: u32) -> Result<ndarray::Array4<f32>, DetectorError> {
    if frame.channels() != 3 {
        return Err(DetectorError::Inference(format!(
            "expected a 3-channel frame, got {} channels",
            frame.channels()
        )));
    }
    let src: ImageBuffer<Rgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width(), frame.height(), frame.data())
            .ok_or_else(|| DetectorError::Inference("frame buffer size mismatch".into()))?;
    let resized = imageops::resize(&src, size, size, FilterType::Triangle);

    let s = size as usize;
    let mut blob = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, px) in resized.enumerate_pixels() {
        let [r, g, b] = px.0;
        let (x, y) = (x as usize, y as usize);
        blob[[0, 0, y, x]] = b as f32 - MEAN_BGR[0];
        blob[[0, 1, y, x]] = g as f32 - MEAN_BGR[1];
        blob[[0, 2, y, x]] = r as f32 - MEAN_BGR[2];
    }
    Ok(blob)
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Decode `[1, 1, N, 7]` rows into detections in a `width × height` frame.
///
/// Box corners come out of the model normalized to `0..1`; they are scaled
/// but not clamped or truncated here.
fn parse_detections(
    data: &[f32],
    shape: &[usize],
    width: u32,
    height: u32,
) -> Result<Vec<RawDetection>, DetectorError> {
    if shape.len() != 4 || shape[3] != ROW_LEN {
        return Err(DetectorError::MalformedOutput(format!(
            "expected output shape [1, 1, N, {ROW_LEN}], got {shape:?}"
        )));
    }
    let rows = shape[..3].iter().product::<usize>();
    if data.len() < rows * ROW_LEN {
        return Err(DetectorError::MalformedOutput(format!(
            "output holds {} values, shape {shape:?} needs {}",
            data.len(),
            rows * ROW_LEN
        )));
    }

    let (w, h) = (width as f32, height as f32);
    data.chunks_exact(ROW_LEN)
        .take(rows)
        .enumerate()
        .map(|(i, row)| {
            if let Some(value) = row[2..].iter().find(|v| !v.is_finite()) {
                return Err(DetectorError::MalformedOutput(format!(
                    "row {i} holds non-finite value {value}"
                )));
            }
            Ok(RawDetection::new(
                row[2],
                BoundingBox::new(row[3] * w, row[4] * h, row[5] * w, row[6] * h),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── Blob ─────────────────────────────────────────────────────────

    #[test]
    fn test_blob_shape_is_nchw() {
        let blob = build_blob(&Frame::filled(320, 240, [0, 0, 0]), 300).unwrap();
        assert_eq!(blob.shape(), &[1, 3, 300, 300]);
    }

    #[test]
    fn test_blob_is_bgr_mean_subtracted() {
        let blob = build_blob(&Frame::filled(64, 48, [10, 20, 30]), 16).unwrap();
        assert_relative_eq!(blob[[0, 0, 5, 5]], 30.0 - 104.0);
        assert_relative_eq!(blob[[0, 1, 5, 5]], 20.0 - 177.0);
        assert_relative_eq!(blob[[0, 2, 5, 5]], 10.0 - 123.0);
    }

    #[test]
    fn test_blob_rejects_gray_frame() {
        let gray = Frame::new(vec![0u8; 16], 4, 4, 1);
        assert!(matches!(
            build_blob(&gray, 16),
            Err(DetectorError::Inference(_))
        ));
    }

    // ── Output parsing ───────────────────────────────────────────────

    #[test]
    fn test_parse_scales_to_frame_pixels() {
        let data = [0.0, 1.0, 0.93, 0.1, 0.25, 0.5, 0.75];
        let dets = parse_detections(&data, &[1, 1, 1, 7], 320, 240).unwrap();
        assert_eq!(dets.len(), 1);
        assert_relative_eq!(dets[0].confidence, 0.93);
        assert_relative_eq!(dets[0].bbox.x1, 32.0);
        assert_relative_eq!(dets[0].bbox.y1, 60.0);
        assert_relative_eq!(dets[0].bbox.x2, 160.0);
        assert_relative_eq!(dets[0].bbox.y2, 180.0);
    }

    #[test]
    fn test_parse_keeps_model_order_and_low_scores() {
        let data = [
            0.0, 1.0, 0.2, 0.0, 0.0, 0.1, 0.1, //
            0.0, 1.0, 0.9, 0.5, 0.5, 0.9, 0.9,
        ];
        let dets = parse_detections(&data, &[1, 1, 2, 7], 100, 100).unwrap();
        assert_eq!(dets.len(), 2);
        assert_relative_eq!(dets[0].confidence, 0.2);
        assert_relative_eq!(dets[1].confidence, 0.9);
    }

    #[test]
    fn test_parse_empty_output() {
        let dets = parse_detections(&[], &[1, 1, 0, 7], 320, 240).unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_rank() {
        let result = parse_detections(&[0.0; 7], &[1, 7], 320, 240);
        assert!(matches!(result, Err(DetectorError::MalformedOutput(_))));
    }

    #[test]
    fn test_parse_rejects_wrong_row_length() {
        let result = parse_detections(&[0.0; 6], &[1, 1, 1, 6], 320, 240);
        assert!(matches!(result, Err(DetectorError::MalformedOutput(_))));
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        let result = parse_detections(&[0.0; 7], &[1, 1, 2, 7], 320, 240);
        assert!(matches!(result, Err(DetectorError::MalformedOutput(_))));
    }

    #[rstest]
    #[case::nan_score(2, f32::NAN)]
    #[case::infinite_corner(3, f32::INFINITY)]
    #[case::negative_infinite_corner(6, f32::NEG_INFINITY)]
    fn test_parse_rejects_non_finite_values(#[case] column: usize, #[case] value: f32) {
        let mut data = [
            0.0, 1.0, 0.9, 0.1, 0.1, 0.5, 0.5, //
            0.0, 1.0, 0.9, 0.1, 0.1, 0.5, 0.5,
        ];
        data[7 + column] = value;
        let result = parse_detections(&data, &[1, 1, 2, 7], 320, 240);
        assert!(matches!(result, Err(DetectorError::MalformedOutput(msg)) if msg.contains("row 1")));
    }

    #[test]
    fn test_parse_ignores_unused_leading_columns() {
        // Image id and class id are never read
        let data = [f32::NAN, f32::NAN, 0.9, 0.1, 0.1, 0.5, 0.5];
        assert!(parse_detections(&data, &[1, 1, 1, 7], 320, 240).is_ok());
    }
}
