// normalize.rs — Local contrast normalization.
//
// Each pixel is rescaled against the mean and variance of the block-sized
// window around it, so every region of the print ends up with mean 0 and
// variance 1 regardless of pressure or illumination. The sign is flipped
// on the way: ridges are dark on the sensor and come out positive here,
// which is the polarity the Gabor stage and binarization expect.

use crate::convolution::box_mean;
use crate::image::{Image, Pixel};

/// Variance floor (intensity²) so flat background does not blow up.
const VARIANCE_FLOOR: f32 = 1.0;

/// Normalize to local mean 0 / variance 1 over `block_size` windows, ridges
/// positive.
pub fn normalize<T: Pixel>(src: &Image<T>, block_size: usize) -> Image<f32> {
    let half = (block_size / 2).max(1);
    let squares = src.map(|v| {
        let v = v.to_f32();
        v * v
    });
    let mean = box_mean(src, half);
    let mean_sq = box_mean(&squares, half);

    Image::from_fn(src.width(), src.height(), |x, y| {
        let m = mean.get(x, y);
        let var = (mean_sq.get(x, y) - m * m).max(VARIANCE_FLOOR);
        (m - src.get(x, y).to_f32()) / var.sqrt()
    })
}
