//! Contrast-limited adaptive histogram equalization on 8-bit luminance.
//!
//! The image is split into a grid of tiles. Each tile gets its own clipped
//! histogram-equalization lookup table, and every pixel is mapped through
//! the bilinear blend of the four nearest tile tables so tile seams do not
//! show. Tiles that overhang the image edge sample it with 101-reflection.

use image::GrayImage;

const BINS: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub struct Clahe {
    clip_limit: f64,
    tiles_x: u32,
    tiles_y: u32,
}

impl Clahe {
    /// `clip_limit` is relative to a uniform histogram; `grid` is
    /// `(tiles across, tiles down)`, each at least 1.
    pub fn new(clip_limit: f64, grid: (u32, u32)) -> Self {
        Self {
            clip_limit,
            tiles_x: grid.0.max(1),
            tiles_y: grid.1.max(1),
        }
    }

    pub fn apply(&self, src: &GrayImage) -> GrayImage {
        let (width, height) = src.dimensions();
        if width == 0 || height == 0 {
            return src.clone();
        }

        let tile_w = width.div_ceil(self.tiles_x) as usize;
        let tile_h = height.div_ceil(self.tiles_y) as usize;
        let luts = self.tile_luts(src, tile_w, tile_h);

        let tiles_x = self.tiles_x as usize;
        let tiles_y = self.tiles_y as usize;
        let inv_tw = 1.0 / tile_w as f32;
        let inv_th = 1.0 / tile_h as f32;

        let mut out = GrayImage::new(width, height);
        for y in 0..height {
            let tyf = y as f32 * inv_th - 0.5;
            let ty1 = tyf.floor() as i64;
            let ya = tyf - ty1 as f32;
            let ty2 = (ty1 + 1).min(tiles_y as i64 - 1) as usize;
            let ty1 = ty1.max(0) as usize;

            for x in 0..width {
                let txf = x as f32 * inv_tw - 0.5;
                let tx1 = txf.floor() as i64;
                let xa = txf - tx1 as f32;
                let tx2 = (tx1 + 1).min(tiles_x as i64 - 1) as usize;
                let tx1 = tx1.max(0) as usize;

                let v = src.get_pixel(x, y).0[0] as usize;
                let lut = |tx: usize, ty: usize| luts[(ty * tiles_x + tx) * BINS + v] as f32;

                let top = lut(tx1, ty1) * (1.0 - xa) + lut(tx2, ty1) * xa;
                let bottom = lut(tx1, ty2) * (1.0 - xa) + lut(tx2, ty2) * xa;
                let value = top * (1.0 - ya) + bottom * ya;
                out.put_pixel(x, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
            }
        }
        out
    }

    /// One 256-entry table per tile, row-major over the tile grid.
    fn tile_luts(&self, src: &GrayImage, tile_w: usize, tile_h: usize) -> Vec<u8> {
        let (width, height) = src.dimensions();
        let tile_area = tile_w * tile_h;
        let clip = ((self.clip_limit * tile_area as f64 / BINS as f64) as usize).max(1);
        let lut_scale = (BINS - 1) as f32 / tile_area as f32;

        let tiles_x = self.tiles_x as usize;
        let tiles_y = self.tiles_y as usize;
        let mut luts = vec![0u8; tiles_x * tiles_y * BINS];

        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let mut hist = [0usize; BINS];
                for dy in 0..tile_h {
                    let sy = reflect_101((ty * tile_h + dy) as i64, height as i64);
                    for dx in 0..tile_w {
                        let sx = reflect_101((tx * tile_w + dx) as i64, width as i64);
                        hist[src.get_pixel(sx as u32, sy as u32).0[0] as usize] += 1;
                    }
                }
                clip_histogram(&mut hist, clip);

                let lut = &mut luts[(ty * tiles_x + tx) * BINS..][..BINS];
                let mut sum = 0usize;
                for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
                    sum += count;
                    *entry = (sum as f32 * lut_scale).round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        luts
    }
}

/// Caps every bin at `clip` and spreads the excess evenly, with any remainder
/// handed out one count at a time across evenly spaced bins.
fn clip_histogram(hist: &mut [usize; BINS], clip: usize) {
    let mut excess = 0usize;
    for count in hist.iter_mut() {
        if *count > clip {
            excess += *count - clip;
            *count = clip;
        }
    }

    let batch = excess / BINS;
    let mut residual = excess - batch * BINS;
    for count in hist.iter_mut() {
        *count += batch;
    }

    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

/// Mirror index `i` into `0..n` without repeating the edge pixel.
fn reflect_101(i: i64, n: i64) -> usize {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - m }) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn gradient(width: u32, height: u32, lo: u8, hi: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            let t = x as f32 / (width - 1).max(1) as f32;
            image::Luma([(lo as f32 + t * (hi - lo) as f32).round() as u8])
        })
    }

    fn range(img: &GrayImage) -> (u8, u8) {
        let min = img.pixels().map(|p| p.0[0]).min().unwrap();
        let max = img.pixels().map(|p| p.0[0]).max().unwrap();
        (min, max)
    }

    #[test]
    fn test_preserves_dimensions() {
        let out = Clahe::new(2.0, (8, 8)).apply(&gradient(320, 240, 0, 255));
        assert_eq!(out.dimensions(), (320, 240));
    }

    #[test]
    fn test_uniform_input_gives_uniform_output() {
        let src = GrayImage::from_pixel(320, 240, image::Luma([90]));
        let out = Clahe::new(2.0, (8, 8)).apply(&src);
        let (min, max) = range(&out);
        assert_eq!(min, max);
    }

    #[test]
    fn test_stretches_low_contrast_input() {
        let src = gradient(320, 240, 100, 140);
        let out = Clahe::new(2.0, (8, 8)).apply(&src);
        let (in_min, in_max) = range(&src);
        let (out_min, out_max) = range(&out);
        assert!(out_max - out_min > in_max - in_min);
    }

    #[test]
    fn test_is_deterministic() {
        let src = gradient(320, 240, 20, 220);
        let clahe = Clahe::new(2.0, (8, 8));
        assert_eq!(clahe.apply(&src), clahe.apply(&src));
    }

    #[test]
    fn test_tiles_equalize_independently() {
        // Left half dark, right half bright: each half is uniform, so every
        // pixel well inside a half maps to that half's constant.
        let src = GrayImage::from_fn(320, 240, |x, _| image::Luma([if x < 160 { 40 } else { 200 }]));
        let out = Clahe::new(2.0, (8, 8)).apply(&src);
        assert_eq!(out.get_pixel(10, 10), out.get_pixel(60, 200));
        assert_eq!(out.get_pixel(300, 10), out.get_pixel(260, 200));
        assert!(out.get_pixel(10, 10).0[0] < out.get_pixel(300, 10).0[0]);
    }

    #[rstest]
    #[case::not_divisible(13, 7)]
    #[case::smaller_than_grid(3, 3)]
    #[case::single_pixel(1, 1)]
    fn test_odd_sizes_do_not_panic(#[case] width: u32, #[case] height: u32) {
        let src = gradient(width, height, 0, 255);
        let out = Clahe::new(2.0, (8, 8)).apply(&src);
        assert_eq!(out.dimensions(), (width, height));
    }

    #[test]
    fn test_empty_image_returned_unchanged() {
        let src = GrayImage::new(0, 0);
        assert_eq!(Clahe::new(2.0, (8, 8)).apply(&src).dimensions(), (0, 0));
    }

    #[test]
    fn test_clip_histogram_conserves_counts() {
        let mut hist = [0usize; BINS];
        hist[10] = 1000;
        hist[200] = 37;
        clip_histogram(&mut hist, 20);
        assert_eq!(hist.iter().sum::<usize>(), 1037);
    }

    #[rstest]
    #[case(0, 5, 0)]
    #[case(4, 5, 4)]
    #[case(5, 5, 3)]
    #[case(6, 5, 2)]
    #[case(-1, 5, 1)]
    #[case(7, 1, 0)]
    fn test_reflect_101(#[case] i: i64, #[case] n: i64, #[case] expected: usize) {
        assert_eq!(reflect_101(i, n), expected);
    }
}
