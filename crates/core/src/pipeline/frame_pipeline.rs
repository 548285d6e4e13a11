use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::annotation::infrastructure::outline_annotator::OutlineAnnotator;
use crate::codec::domain::data_uri::{self, FramePayload};
use crate::codec::domain::frame_codec::{CodecError, FrameCodec};
use crate::codec::infrastructure::jpeg_codec::JpegFrameCodec;
use crate::detection::domain::detection_filter::DetectionFilter;
use crate::detection::domain::face_detector::DetectorError;
use crate::detection::infrastructure::detector_pool::DetectorPool;
use crate::preprocessing::domain::preprocessor::{PreprocessError, Preprocessor};
use crate::shared::face::AcceptedFace;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("decode/encode failed: {0}")]
    Codec(#[from] CodecError),
    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("detection failed: {0}")]
    Detector(#[from] DetectorError),
    #[error("frame worker stopped: {0}")]
    Worker(String),
}

/// Pipeline stages in execution order, as named in timings and logs.
pub const STAGE_NAMES: [&str; 5] = ["decode", "preprocess", "detect", "annotate", "encode"];

/// Wall-clock time spent in each stage of one invocation, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub decode_ms: f64,
    pub preprocess_ms: f64,
    pub detect_ms: f64,
    pub annotate_ms: f64,
    pub encode_ms: f64,
}

impl StageTimings {
    pub fn total_ms(&self) -> f64 {
        self.decode_ms + self.preprocess_ms + self.detect_ms + self.annotate_ms + self.encode_ms
    }

    /// Durations in `STAGE_NAMES` order.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.decode_ms,
            self.preprocess_ms,
            self.detect_ms,
            self.annotate_ms,
            self.encode_ms,
        ]
    }
}

/// Output of one successful invocation.
#[derive(Clone, Debug)]
pub struct PipelineResult {
    /// Encoded JPEG of the source frame with face outlines drawn on it.
    pub annotated_jpeg: Vec<u8>,
    pub faces: Vec<AcceptedFace>,
    pub timings: StageTimings,
}

impl PipelineResult {
    /// The annotated frame as a `data:image/jpeg;base64,` URI.
    pub fn frame_uri(&self) -> String {
        data_uri::wrap_jpeg(&self.annotated_jpeg)
    }
}

/// One frame, end to end: decode → preprocess → detect → filter → annotate → encode.
///
/// Stateless between calls and shareable across connections; the detector
/// pool is the only shared resource. Each call owns its decoded frame, so
/// annotation never touches a buffer anyone else can see.
pub struct FramePipeline {
    codec: Arc<dyn FrameCodec>,
    preprocessor: Preprocessor,
    detector: Arc<DetectorPool>,
    filter: DetectionFilter,
    annotator: Box<dyn FrameAnnotator>,
}

impl FramePipeline {
    pub fn new(
        codec: Arc<dyn FrameCodec>,
        preprocessor: Preprocessor,
        detector: Arc<DetectorPool>,
        filter: DetectionFilter,
        annotator: Box<dyn FrameAnnotator>,
    ) -> Self {
        Self {
            codec,
            preprocessor,
            detector,
            filter,
            annotator,
        }
    }

    /// Default stages around `detector`, encoding at `jpeg_quality`.
    pub fn standard(detector: Arc<DetectorPool>, jpeg_quality: u8) -> Self {
        Self::new(
            Arc::new(JpegFrameCodec::new().with_quality(jpeg_quality)),
            Preprocessor::default(),
            detector,
            DetectionFilter::default(),
            Box::new(OutlineAnnotator::default()),
        )
    }

    pub fn process(&self, payload: FramePayload) -> Result<PipelineResult, PipelineError> {
        let mut timings = StageTimings::default();

        let t = Instant::now();
        let bytes = payload.into_image_bytes()?;
        let mut frame = self.codec.decode(&bytes)?;
        timings.decode_ms = elapsed_ms(t);

        let t = Instant::now();
        let processed = self.preprocessor.preprocess(&frame)?;
        let (scale_x, scale_y) = (processed.scale_x(), processed.scale_y());
        timings.preprocess_ms = elapsed_ms(t);

        let t = Instant::now();
        let raw = self.detector.detect(processed.into_frame())?;
        let faces = self.filter.filter(&raw, scale_x, scale_y);
        timings.detect_ms = elapsed_ms(t);

        let t = Instant::now();
        self.annotator.annotate(&mut frame, &faces);
        timings.annotate_ms = elapsed_ms(t);

        let t = Instant::now();
        let annotated_jpeg = self.codec.encode(&frame)?;
        timings.encode_ms = elapsed_ms(t);

        Ok(PipelineResult {
            annotated_jpeg,
            faces,
            timings,
        })
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
