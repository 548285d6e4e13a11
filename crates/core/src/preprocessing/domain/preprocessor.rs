use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Rgb};
use thiserror::Error;

use super::clahe::Clahe;
use crate::shared::constants::{CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID, PROCESS_HEIGHT, PROCESS_WIDTH};
use crate::shared::frame::Frame;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("cannot preprocess an empty frame")]
    EmptyFrame,
    #[error("expected a 3-channel frame, got {0} channels")]
    UnsupportedChannels(u8),
}

/// Fixed-resolution, contrast-enhanced copy of a frame, plus the factors
/// that map its coordinates back onto the source frame.
#[derive(Clone, Debug)]
pub struct ProcessedFrame {
    frame: Frame,
    scale_x: f64,
    scale_y: f64,
}

impl ProcessedFrame {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }

    /// Source width / processed width.
    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    /// Source height / processed height.
    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }
}

/// Scale factors from a `processed` resolution back to a `source` one.
pub fn scale_factors(source: (u32, u32), processed: (u32, u32)) -> (f64, f64) {
    (
        source.0 as f64 / processed.0 as f64,
        source.1 as f64 / processed.1 as f64,
    )
}

/// Resize → luminance → CLAHE → replicate to 3 channels.
///
/// Reads the source frame without modifying it; the original pixels are
/// still needed for annotation.
pub struct Preprocessor {
    width: u32,
    height: u32,
    clahe: Clahe,
}

impl Preprocessor {
    pub fn new(width: u32, height: u32, clahe: Clahe) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            clahe,
        }
    }

    pub fn preprocess(&self, frame: &Frame) -> Result<ProcessedFrame, PreprocessError> {
        if frame.is_empty() {
            return Err(PreprocessError::EmptyFrame);
        }
        if frame.channels() != 3 {
            return Err(PreprocessError::UnsupportedChannels(frame.channels()));
        }

        let src: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(frame.width(), frame.height(), frame.data())
                .ok_or(PreprocessError::EmptyFrame)?;
        let resized = imageops::resize(&src, self.width, self.height, FilterType::Triangle);

        let gray = GrayImage::from_fn(self.width, self.height, |x, y| {
            let [r, g, b] = resized.get_pixel(x, y).0;
            image::Luma([luminance(r, g, b)])
        });
        let enhanced = self.clahe.apply(&gray);

        let data = enhanced
            .into_raw()
            .into_iter()
            .flat_map(|v| [v, v, v])
            .collect();

        let (scale_x, scale_y) =
            scale_factors((frame.width(), frame.height()), (self.width, self.height));

        Ok(ProcessedFrame {
            frame: Frame::new(data, self.width, self.height, 3),
            scale_x,
            scale_y,
        })
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(
            PROCESS_WIDTH,
            PROCESS_HEIGHT,
            Clahe::new(CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID),
        )
    }
}

/// ITU-R BT.601 luma in 14-bit fixed point, rounded.
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    const R: u32 = 4899; // 0.299
    const G: u32 = 9617; // 0.587
    const B: u32 = 1868; // 0.114
    ((r as u32 * R + g as u32 * G + b as u32 * B + (1 << 13)) >> 14) as u8
}
