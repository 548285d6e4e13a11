/// A decoded still image: contiguous RGB bytes in row-major order, origin top-left.
///
/// Codec conversion happens at the pipeline edges only; every stage in
/// between sees the same interleaved layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * channels as usize,
            "frame buffer does not match {width}x{height}x{channels}"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// A frame of `width` x `height` where every pixel is `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(data, width, height, 3)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// True when the frame holds no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }
}
