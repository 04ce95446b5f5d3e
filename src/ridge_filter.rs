// ridge_filter.rs — Orientation- and frequency-tuned Gabor enhancement.
//
// Every ROI pixel is filtered with the even Gabor kernel matching its own
// orientation and its block's wavelength. Building a kernel per pixel would
// dominate the cost, so orientations are quantized into bins over [0, π)
// and wavelengths to half pixels, and kernels are cached per (bin, step).

use std::collections::HashMap;
use std::f32::consts::PI;

use tracing::trace;

use crate::convolution::{apply_kernel_at, Kernel2d};
use crate::frequency::WavelengthMap;
use crate::gabor::even_kernel;
use crate::image::Image;
use crate::orientation::OrientationField;

/// Lazily built even Gabor kernels keyed by quantized (θ, λ).
pub struct KernelCache {
    bins: usize,
    sigma: f32,
    kernels: HashMap<(usize, u32), Kernel2d>,
}

impl KernelCache {
    pub fn new(bins: usize, sigma: f32) -> Self {
        assert!(bins > 0, "orientation bins must be > 0");
        KernelCache {
            bins,
            sigma,
            kernels: HashMap::new(),
        }
    }

    /// Quantized key for orientation `theta` (radians) and `wavelength`.
    pub fn key(&self, theta: f32, wavelength: f32) -> (usize, u32) {
        let bin = ((theta / PI) * self.bins as f32).round() as usize % self.bins;
        let step = (wavelength * 2.0).round().max(1.0) as u32;
        (bin, step)
    }

    pub fn get(&mut self, theta: f32, wavelength: f32) -> &Kernel2d {
        let key = self.key(theta, wavelength);
        let (bins, sigma) = (self.bins, self.sigma);
        self.kernels.entry(key).or_insert_with(|| {
            let theta = key.0 as f32 * PI / bins as f32;
            let wavelength = key.1 as f32 / 2.0;
            even_kernel(theta, wavelength, sigma)
        })
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }
}

/// Gabor-enhance `src` inside the ROI of `field`; 0 outside.
pub fn gabor_enhance(
    src: &Image<f32>,
    field: &OrientationField,
    wavelengths: &WavelengthMap,
    bins: usize,
    sigma: f32,
) -> Image<f32> {
    let mut cache = KernelCache::new(bins, sigma);
    let mut out = Image::<f32>::new(src.width(), src.height());

    for y in 0..src.height() {
        for x in 0..src.width() {
            let Some(theta) = field.get(x, y) else {
                continue;
            };
            let kernel = cache.get(theta, wavelengths.at(x, y));
            out.set(x, y, apply_kernel_at(src, kernel, x, y));
        }
    }

    trace!("Gabor enhancement used {} cached kernels", cache.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockGrid;
    use crate::frequency::estimate_wavelengths;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_key_quantization_wraps() {
        let cache = KernelCache::new(32, 4.0);
        assert_eq!(cache.key(0.0, 9.0), (0, 18));
        assert_eq!(cache.key(PI - 0.01, 9.2), (0, 18));
        assert_eq!(cache.key(FRAC_PI_2, 8.8), (16, 18));
    }

    #[test]
    fn test_cache_reuses_kernels() {
        let mut cache = KernelCache::new(16, 4.0);
        cache.get(0.1, 9.0);
        cache.get(0.12, 9.1);
        assert_eq!(cache.len(), 1);
        cache.get(1.0, 9.0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_enhancement_suppresses_cross_noise() {
        // Vertical ridges plus a weaker horizontal pattern; the filter tuned
        // to the vertical ridges should keep the first and drop the second.
        let ridges = |x: usize| (2.0 * PI * x as f32 / 9.0).cos();
        let img = Image::from_fn(64, 64, |x, y| ridges(x) + 0.5 * (2.0 * PI * y as f32 / 5.0).cos());
        let roi = Image::filled(64, 64, true);
        let field = OrientationField::uniform(FRAC_PI_2, roi);
        let wavelengths = estimate_wavelengths(&Image::from_fn(64, 64, |x, _| ridges(x)), &field, 16, 3.0, 25.0, 9.0);
        assert_eq!(wavelengths.grid(), &BlockGrid::new(64, 64, 16));

        let out = gabor_enhance(&img, &field, &wavelengths, 32, 4.0);
        // Along a ridge crest the response should barely vary with y.
        let crest: Vec<f32> = (20..44).map(|y| out.get(27, y)).collect();
        let max = crest.iter().copied().fold(f32::MIN, f32::max);
        let min = crest.iter().copied().fold(f32::MAX, f32::min);
        assert!(min > 0.0);
        assert!((max - min) / max < 0.1, "crest varies {min}..{max}");
        // And valleys stay negative.
        assert!(out.get(31, 32) < 0.0);
    }
}
