use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::codec::domain::frame_codec::{CodecError, FrameCodec};
use crate::shared::constants::DEFAULT_JPEG_QUALITY;
use crate::shared::frame::Frame;

/// Codec backed by the `image` crate.
///
/// Decodes any format `image` can sniff from the bytes (JPEG, PNG, WebP, ...)
/// into RGB8, and always encodes baseline JPEG.
pub struct JpegFrameCodec {
    quality: u8,
}

impl JpegFrameCodec {
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Sets JPEG quality, clamped to `1..=100`.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec for JpegFrameCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::EmptyImage);
        }
        let img = image::load_from_memory(bytes)
            .map_err(|e| CodecError::Decode(e.to_string()))?
            .to_rgb8();

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(CodecError::EmptyImage);
        }
        Ok(Frame::new(img.into_raw(), width, height, 3))
    }

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, CodecError> {
        if frame.channels() != 3 {
            return Err(CodecError::Encode(format!(
                "expected 3 channels, got {}",
                frame.channels()
            )));
        }
        let mut buf = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode(
                frame.data(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}
