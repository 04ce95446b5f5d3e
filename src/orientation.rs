// orientation.rs — Ridge orientation from the smoothed structure tensor.
//
// Same tensor as a Harris detector, read differently: instead of scoring
// corners from its eigenvalues we take the direction of its dominant
// eigenvector.
//
//   1. Sobel gradients gx, gy (after a light Gaussian)
//   2. Products gx², gy², gx·gy
//   3. Gaussian window over each product → Gxx, Gyy, Gxy
//   4. Dominant gradient direction φ = ½·atan2(2Gxy, Gxx − Gyy)
//   5. Ridges run perpendicular to the gradient: θ = φ + π/2, wrapped into [0, π)
//
// Orientations are axial (θ and θ + π are the same ridge), so averaging
// is done on doubled angles.

use std::f32::consts::{FRAC_PI_2, PI};

use crate::convolution::gaussian_blur;
use crate::gradient::smoothed_gradients;
use crate::image::Image;

/// Per-pixel ridge orientation in [0, π), defined only inside the ROI.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationField {
    angles: Image<f32>,
    defined: Image<bool>,
}

/// Wrap any angle into [0, π).
#[inline]
pub fn wrap_axial(theta: f32) -> f32 {
    let t = theta.rem_euclid(PI);
    // rem_euclid can round up to exactly π for tiny negative inputs.
    if t >= PI {
        0.0
    } else {
        t
    }
}

impl OrientationField {
    /// Build a field from precomputed angles. Angles are wrapped into [0, π).
    ///
    /// # Panics
    /// Panics if the two grids differ in size.
    pub fn from_parts(angles: Image<f32>, defined: Image<bool>) -> Self {
        assert!(
            angles.width() == defined.width() && angles.height() == defined.height(),
            "orientation and mask sizes differ"
        );
        OrientationField {
            angles: angles.map(wrap_axial),
            defined,
        }
    }

    /// Same orientation `theta` everywhere `defined` is set.
    pub fn uniform(theta: f32, defined: Image<bool>) -> Self {
        let angles = Image::filled(defined.width(), defined.height(), wrap_axial(theta));
        OrientationField { angles, defined }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.angles.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.angles.height()
    }

    /// Orientation at (x, y) in radians, `None` outside the ROI.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if self.defined.get(x, y) {
            Some(self.angles.get(x, y))
        } else {
            None
        }
    }

    /// Orientation at (x, y) in degrees, in [0°, 180°).
    pub fn degrees(&self, x: usize, y: usize) -> Option<f32> {
        self.get(x, y).map(|t| {
            let d = t.to_degrees();
            if d >= 180.0 {
                0.0
            } else {
                d
            }
        })
    }

    pub fn mask(&self) -> &Image<bool> {
        &self.defined
    }

    /// Doubled-angle mean orientation over `[x0, x1) × [y0, y1)`.
    /// `None` when no pixel in the window is defined.
    pub fn average(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> Option<f32> {
        let mut c = 0.0f32;
        let mut s = 0.0f32;
        let mut n = 0usize;
        for y in y0..y1.min(self.height()) {
            for x in x0..x1.min(self.width()) {
                if let Some(t) = self.get(x, y) {
                    c += (2.0 * t).cos();
                    s += (2.0 * t).sin();
                    n += 1;
                }
            }
        }
        if n == 0 {
            return None;
        }
        Some(wrap_axial(0.5 * s.atan2(c)))
    }
}

/// Estimate the ridge orientation of `src` inside `roi`.
pub fn estimate_orientation(
    src: &Image<f32>,
    roi: &Image<bool>,
    gradient_sigma: f32,
    window_sigma: f32,
) -> OrientationField {
    let g = smoothed_gradients(src, gradient_sigma);
    let w = src.width();
    let h = src.height();

    let mut gxx = Image::<f32>::new(w, h);
    let mut gyy = Image::<f32>::new(w, h);
    let mut gxy = Image::<f32>::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = g.gx.get(x, y);
            let dy = g.gy.get(x, y);
            gxx.set(x, y, dx * dx);
            gyy.set(x, y, dy * dy);
            gxy.set(x, y, dx * dy);
        }
    }

    let sxx = gaussian_blur(&gxx, window_sigma);
    let syy = gaussian_blur(&gyy, window_sigma);
    let sxy = gaussian_blur(&gxy, window_sigma);

    let angles = Image::from_fn(w, h, |x, y| {
        let phi = 0.5 * (2.0 * sxy.get(x, y)).atan2(sxx.get(x, y) - syy.get(x, y));
        wrap_axial(phi + FRAC_PI_2)
    });

    OrientationField {
        angles,
        defined: roi.clone(),
    }
}
