// convolution.rs — Separable 1D passes and dense 2D kernel sampling.
//
// Separable kernels (Gaussian smoothing, box means, Sobel) run as a row
// pass followed by a column pass, O(2k) per pixel instead of O(k²).
// Oriented kernels (Gabor) are not separable; those are sampled one pixel
// at a time with `apply_kernel_at`, since the enhancer picks a different
// kernel for every pixel anyway.
//
// BORDER HANDLING: clamp (replicate edge pixels) everywhere.

use crate::image::{Image, Pixel};

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Rows,
    Cols,
}

/// One 1D pass of a centered, odd-length kernel along `axis`.
///
/// # Panics
/// Panics if the kernel is empty or has even length.
fn convolve_axis<T: Pixel>(src: &Image<T>, kernel: &[f32], axis: Axis) -> Image<f32> {
    assert!(
        kernel.len() % 2 == 1,
        "kernel length must be odd and non-zero (got {})",
        kernel.len()
    );
    let (w, h) = (src.width(), src.height());
    let half = kernel.len() / 2;
    let extent = if axis == Axis::Rows { w } else { h };

    Image::from_fn(w, h, |x, y| {
        let along = if axis == Axis::Rows { x } else { y };
        let tap = |offset: usize| match axis {
            Axis::Rows => (offset, y),
            Axis::Cols => (x, offset),
        };
        if along >= half && along + half < extent {
            // SAFETY: along ± half stays inside the image.
            kernel
                .iter()
                .enumerate()
                .map(|(k, &weight)| {
                    let (sx, sy) = tap(along + k - half);
                    unsafe { src.get_unchecked(sx, sy) }.to_f32() * weight
                })
                .sum()
        } else {
            kernel
                .iter()
                .enumerate()
                .map(|(k, &weight)| {
                    let (sx, sy) = tap(clamp_index(along as isize + k as isize - half as isize, extent));
                    src.get(sx, sy).to_f32() * weight
                })
                .sum()
        }
    })
}

/// Horizontal pass: convolve every row with `kernel`.
pub fn convolve_rows<T: Pixel>(src: &Image<T>, kernel: &[f32]) -> Image<f32> {
    convolve_axis(src, kernel, Axis::Rows)
}

/// Vertical pass: convolve every column with `kernel`.
pub fn convolve_cols<T: Pixel>(src: &Image<T>, kernel: &[f32]) -> Image<f32> {
    convolve_axis(src, kernel, Axis::Cols)
}

/// `kernel_row` along x, then `kernel_col` along y.
pub fn convolve_separable<T: Pixel>(src: &Image<T>, kernel_row: &[f32], kernel_col: &[f32]) -> Image<f32> {
    convolve_cols(&convolve_rows(src, kernel_row), kernel_col)
}

/// Gaussian blur with a kernel wide enough for ±3σ.
pub fn gaussian_blur<T: Pixel>(src: &Image<T>, sigma: f32) -> Image<f32> {
    let k = gaussian_kernel_1d((3.0 * sigma).ceil().max(1.0) as usize, sigma);
    convolve_separable(src, &k, &k)
}

/// Local mean over a `(2·half+1)²` window.
pub fn box_mean<T: Pixel>(src: &Image<T>, half: usize) -> Image<f32> {
    let k = box_kernel_1d(half);
    convolve_separable(src, &k, &k)
}

/// Sampled Gaussian of `2·half+1` taps, normalized to unit sum.
///
/// # Examples
/// ```
/// let k = ridgeprint::convolution::gaussian_kernel_1d(3, 1.5);
/// assert_eq!(k.len(), 7);
/// assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
/// ```
pub fn gaussian_kernel_1d(half: usize, sigma: f32) -> Vec<f32> {
    assert!(sigma > 0.0, "sigma must be positive");
    let weights: Vec<f32> = (0..=2 * half)
        .map(|i| {
            let d = i as f32 - half as f32;
            (-0.5 * (d / sigma).powi(2)).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Uniform kernel of `2·half+1` taps summing to 1.
pub fn box_kernel_1d(half: usize) -> Vec<f32> {
    let taps = 2 * half + 1;
    vec![1.0 / taps as f32; taps]
}

/// A dense, odd-sized square kernel stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel2d {
    half: usize,
    weights: Vec<f32>,
}

impl Kernel2d {
    /// Build a kernel by evaluating `f(dx, dy)` for dx, dy in [-half, half].
    pub fn from_fn(half: usize, mut f: impl FnMut(f32, f32) -> f32) -> Self {
        let size = 2 * half + 1;
        let mut weights = Vec::with_capacity(size * size);
        for j in 0..size {
            for i in 0..size {
                weights.push(f(i as f32 - half as f32, j as f32 - half as f32));
            }
        }
        Kernel2d { half, weights }
    }

    #[inline]
    pub fn half(&self) -> usize {
        self.half
    }

    #[inline]
    pub fn size(&self) -> usize {
        2 * self.half + 1
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Shift the weights so they sum to zero (no response to flat regions).
    pub fn remove_dc(&mut self) {
        let mean = self.weights.iter().sum::<f32>() / self.weights.len() as f32;
        for w in &mut self.weights {
            *w -= mean;
        }
    }
}

/// Correlate `kernel` with `src` centered at (x, y), clamping at borders.
pub fn apply_kernel_at<T: Pixel>(src: &Image<T>, kernel: &Kernel2d, x: usize, y: usize) -> f32 {
    let half = kernel.half();
    let size = kernel.size();
    let w = src.width();
    let h = src.height();
    let weights = kernel.weights();
    let mut acc = 0.0f32;

    if x >= half && y >= half && x + half < w && y + half < h {
        for j in 0..size {
            let row = &weights[j * size..(j + 1) * size];
            let sy = y + j - half;
            for (i, &kv) in row.iter().enumerate() {
                // SAFETY: the full window lies inside the image.
                acc += unsafe { src.get_unchecked(x + i - half, sy) }.to_f32() * kv;
            }
        }
    } else {
        for j in 0..size {
            let sy = clamp_index(y as isize + j as isize - half as isize, h);
            for i in 0..size {
                let sx = clamp_index(x as isize + i as isize - half as isize, w);
                acc += src.get(sx, sy).to_f32() * weights[j * size + i];
            }
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn ridges(w: usize, h: usize, period: f32) -> Image<f32> {
        Image::from_fn(w, h, |x, _| (2.0 * PI * x as f32 / period).cos())
    }

    #[test]
    fn test_gaussian_kernel_shape() {
        let k = gaussian_kernel_1d(4, 1.5);
        assert_eq!(k.len(), 9);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(k[1], k[7]);
        assert!(k.windows(2).take(4).all(|p| p[0] < p[1]));
    }

    #[test]
    fn test_blur_keeps_flat_background() {
        let img = Image::filled(12, 9, 140u8);
        let out = gaussian_blur(&img, 2.0);
        assert!(out.pixels().all(|(_, _, v)| (v - 140.0).abs() < 1e-3));
    }

    #[test]
    fn test_blur_damps_fine_ridges_more() {
        // Narrow ridges lose more amplitude than wide ones under the same blur.
        let fine = gaussian_blur(&ridges(64, 8, 4.0), 1.5);
        let coarse = gaussian_blur(&ridges(64, 8, 16.0), 1.5);
        assert!(fine.get(32, 4).abs() < 0.2);
        assert!(coarse.get(32, 4) > 0.8);
    }

    #[test]
    fn test_box_mean_over_one_period_is_zero() {
        // A 9-tap box over a 9 px period averages the ridge away.
        let out = box_mean(&ridges(40, 20, 9.0), 4);
        for x in 10..30 {
            assert!(out.get(x, 10).abs() < 1e-4, "x = {x}: {}", out.get(x, 10));
        }
    }

    #[test]
    fn test_border_replicates_edge() {
        // At x = 0 the left tap reads pixel 0 again: 0.25·4 + 0.5·4 + 0.25·8.
        let img = Image::from_vec(3, 1, vec![4.0f32, 8.0, 12.0]);
        assert_eq!(convolve_rows(&img, &[0.25, 0.5, 0.25]).get(0, 0), 5.0);
        let col = Image::from_vec(1, 3, vec![4.0f32, 8.0, 12.0]);
        assert_eq!(convolve_cols(&col, &[0.25, 0.5, 0.25]).get(0, 2), 11.0);
    }

    #[test]
    fn test_separable_order_of_axes() {
        // Derivative along x only sees columns changing.
        let img = Image::from_fn(8, 8, |x, y| (3 * x + 100 * (y % 2)) as f32);
        let out = convolve_separable(&img, &[-0.5, 0.0, 0.5], &[0.0, 1.0, 0.0]);
        assert_eq!(out.get(4, 3), 3.0);
    }

    #[test]
    fn test_kernel2d_identity() {
        let k = Kernel2d::from_fn(1, |dx, dy| if dx == 0.0 && dy == 0.0 { 1.0 } else { 0.0 });
        let img = Image::from_fn(4, 4, |x, y| (x + 4 * y) as f32);
        for (x, y, v) in img.pixels() {
            assert_eq!(apply_kernel_at(&img, &k, x, y), v);
        }
    }

    #[test]
    fn test_kernel2d_remove_dc() {
        let mut k = Kernel2d::from_fn(2, |dx, _| dx.cos() + 1.0);
        k.remove_dc();
        assert!(k.weights().iter().sum::<f32>().abs() < 1e-4);
        let flat = Image::from_vec(9, 9, vec![50.0f32; 81]);
        assert!(apply_kernel_at(&flat, &k, 4, 4).abs() < 1e-2);
        assert!(apply_kernel_at(&flat, &k, 0, 8).abs() < 1e-2);
    }

    #[test]
    #[should_panic(expected = "odd")]
    fn test_even_kernel_panics() {
        convolve_rows(&Image::filled(4, 4, 0.0f32), &[0.5, 0.5]);
    }
}
