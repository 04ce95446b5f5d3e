// gradient.rs — Sobel gradients for the orientation estimate.
//
// Sobel is separable:
//   Gx: row [-1, 0, 1]  col [1, 2, 1]
//   Gy: row [1, 2, 1]   col [-1, 0, 1]
// Border handling (clamp) comes from convolve_separable.

use crate::convolution::{convolve_separable, gaussian_blur};
use crate::image::{Image, Pixel};

const SOBEL_DERIV: [f32; 3] = [-1.0, 0.0, 1.0];
const SOBEL_SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];

/// Horizontal and vertical gradient images of the same size as the input.
pub struct Gradients {
    pub gx: Image<f32>,
    pub gy: Image<f32>,
}

impl Gradients {
    /// Squared gradient magnitude at (x, y).
    #[inline]
    pub fn magnitude_sq(&self, x: usize, y: usize) -> f32 {
        let gx = self.gx.get(x, y);
        let gy = self.gy.get(x, y);
        gx * gx + gy * gy
    }
}

/// Sobel gradients. Positive gx means intensity increasing to the right,
/// positive gy increasing downward.
pub fn sobel_xy<T: Pixel>(src: &Image<T>) -> Gradients {
    Gradients {
        gx: convolve_separable(src, &SOBEL_DERIV, &SOBEL_SMOOTH),
        gy: convolve_separable(src, &SOBEL_SMOOTH, &SOBEL_DERIV),
    }
}

/// Gaussian pre-smoothing followed by Sobel. `sigma <= 0` skips the blur.
pub fn smoothed_gradients<T: Pixel>(src: &Image<T>, sigma: f32) -> Gradients {
    if sigma > 0.0 {
        sobel_xy(&gaussian_blur(src, sigma))
    } else {
        sobel_xy(src)
    }
}
