// gabor.rs — Oriented band-pass kernels.
//
// A Gabor kernel for ridge orientation θ and wavelength λ is a Gaussian
// envelope times a sinusoid running across the ridges:
//
//   u = -dx·sinθ + dy·cosθ        (distance across ridges, along the normal)
//   v =  dx·cosθ + dy·sinθ        (distance along the ridge)
//   even(dx, dy) = exp(-(u² + v²) / 2σ²) · cos(2πu / λ)
//   odd(dx, dy)  = exp(-(u² + v²) / 2σ²) · sin(2πu / λ)
//
// The even kernel alone enhances ridges. The even/odd pair measures local
// energy at that orientation independent of ridge phase, which is what the
// quality assessor needs.

use std::f32::consts::PI;

use crate::convolution::{apply_kernel_at, Kernel2d};
use crate::image::{Image, Pixel};

/// Number of filters in the quality bank.
pub const BANK_SIZE: usize = 16;
/// Wavelength of the quality bank, in pixels.
pub const BANK_WAVELENGTH: f32 = 9.0;
/// Envelope sigma of the quality bank, in pixels.
pub const BANK_SIGMA: f32 = 4.0;

/// Kernel half-size covering ±3σ of the envelope.
pub fn half_size_for(sigma: f32) -> usize {
    (3.0 * sigma).ceil().max(1.0) as usize
}

/// Even-symmetric Gabor kernel, zero-mean, for ridge orientation `theta`
/// (radians) and ridge `wavelength` (pixels).
pub fn even_kernel(theta: f32, wavelength: f32, sigma: f32) -> Kernel2d {
    let (s, c) = theta.sin_cos();
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut k = Kernel2d::from_fn(half_size_for(sigma), |dx, dy| {
        let u = -dx * s + dy * c;
        let v = dx * c + dy * s;
        (-(u * u + v * v) / two_sigma_sq).exp() * (2.0 * PI * u / wavelength).cos()
    });
    k.remove_dc();
    k
}

/// Odd-symmetric companion of `even_kernel`.
pub fn odd_kernel(theta: f32, wavelength: f32, sigma: f32) -> Kernel2d {
    let (s, c) = theta.sin_cos();
    let two_sigma_sq = 2.0 * sigma * sigma;
    Kernel2d::from_fn(half_size_for(sigma), |dx, dy| {
        let u = -dx * s + dy * c;
        let v = dx * c + dy * s;
        (-(u * u + v * v) / two_sigma_sq).exp() * (2.0 * PI * u / wavelength).sin()
    })
}

/// Even/odd kernel pair at one orientation.
#[derive(Debug, Clone)]
pub struct QuadraturePair {
    pub theta: f32,
    even: Kernel2d,
    odd: Kernel2d,
}

impl QuadraturePair {
    pub fn new(theta: f32, wavelength: f32, sigma: f32) -> Self {
        QuadraturePair {
            theta,
            even: even_kernel(theta, wavelength, sigma),
            odd: odd_kernel(theta, wavelength, sigma),
        }
    }

    /// Phase-independent energy |even + i·odd|² at (x, y).
    pub fn energy_at<T: Pixel>(&self, img: &Image<T>, x: usize, y: usize) -> f32 {
        let re = apply_kernel_at(img, &self.even, x, y);
        let im = apply_kernel_at(img, &self.odd, x, y);
        re * re + im * im
    }
}

/// A bank of quadrature pairs at evenly spaced orientations in [0, π).
#[derive(Debug, Clone)]
pub struct GaborBank {
    filters: Vec<QuadraturePair>,
}

impl GaborBank {
    pub fn new(count: usize, wavelength: f32, sigma: f32) -> Self {
        assert!(count > 0, "bank needs at least one filter");
        let filters = (0..count)
            .map(|k| QuadraturePair::new(k as f32 * PI / count as f32, wavelength, sigma))
            .collect();
        GaborBank { filters }
    }

    pub fn filters(&self) -> &[QuadraturePair] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Energy of every filter at (x, y), in bank order.
    pub fn energies_at<T: Pixel>(&self, img: &Image<T>, x: usize, y: usize) -> Vec<f32> {
        self.filters.iter().map(|f| f.energy_at(img, x, y)).collect()
    }
}

impl Default for GaborBank {
    fn default() -> Self {
        GaborBank::new(BANK_SIZE, BANK_WAVELENGTH, BANK_SIGMA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_ridges(w: usize, h: usize, wavelength: f32) -> Image<f32> {
        Image::from_fn(w, h, |x, _| (2.0 * PI * x as f32 / wavelength).cos() * 100.0)
    }

    #[test]
    fn test_even_kernel_is_zero_mean() {
        let k = even_kernel(0.3, 9.0, 4.0);
        assert_eq!(k.size(), 25);
        assert!(k.weights().iter().sum::<f32>().abs() < 1e-3);
    }

    #[test]
    fn test_bank_orientations() {
        let bank = GaborBank::default();
        assert_eq!(bank.len(), 16);
        assert!((bank.filters()[4].theta - PI / 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_energy_peaks_at_ridge_orientation() {
        // Ridges run vertically: θ = π/2 is bank index 8.
        let img = vertical_ridges(64, 64, 9.0);
        let bank = GaborBank::default();
        let energies = bank.energies_at(&img, 32, 32);
        let best = energies
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(best, Some(8));
        assert!(energies[8] > 10.0 * energies[0]);
    }

    #[test]
    fn test_energy_is_phase_independent() {
        let bank = GaborBank::default();
        let a = vertical_ridges(64, 64, 9.0);
        let b = Image::from_fn(64, 64, |x, _| (2.0 * PI * (x as f32 + 2.0) / 9.0).cos() * 100.0);
        let ea = bank.filters()[8].energy_at(&a, 32, 32);
        let eb = bank.filters()[8].energy_at(&b, 32, 32);
        assert!((ea - eb).abs() / ea < 0.05, "energy {ea} vs {eb}");
    }
}
