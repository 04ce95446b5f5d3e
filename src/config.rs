// config.rs — Tolerances and thresholds for every top-level call.
//
// A Config is built once by the caller and passed by reference; nothing in
// the crate keeps it around between calls. All fields have defaults, and
// `#[serde(default)]` lets a partial document override just a few.

use serde::{Deserialize, Serialize};

/// What a sample is being assessed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purpose {
    Enroll,
    Verify,
}

/// Minimum spectral and spatial quality for a sample to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub spectral: f32,
    pub spatial: f32,
}

impl QualityThresholds {
    pub const REGISTER: QualityThresholds = QualityThresholds {
        spectral: 0.62,
        spatial: 0.35,
    };

    pub const VERIFY: QualityThresholds = QualityThresholds {
        spectral: 0.52,
        spatial: 0.35,
    };

    pub fn accepts(&self, spectral: f32, spatial: f32) -> bool {
        spectral >= self.spectral && spatial >= self.spatial
    }
}

/// Ridge enhancer and feature extractor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Block edge in pixels for normalization, segmentation, frequency
    /// estimation and binarization.
    pub block_size: usize,
    /// Fraction of the largest block variance a block needs to be inside
    /// the ROI.
    pub segment_threshold: f32,
    /// Gaussian sigma applied before the Sobel gradients.
    pub gradient_sigma: f32,
    /// Gaussian sigma of the structure-tensor window.
    pub orientation_sigma: f32,
    /// Envelope sigma of the enhancement Gabor kernels.
    pub gabor_sigma: f32,
    /// Accepted ridge wavelength range in pixels.
    pub min_wavelength: f32,
    pub max_wavelength: f32,
    /// Used when no block yields a valid wavelength.
    pub default_wavelength: f32,
    /// Orientation quantization of the Gabor kernel cache.
    pub orientation_bins: usize,
    /// Spatial quality the enhanced image must keep.
    pub min_enhanced_spatial: f32,
    /// Cell edge in pixels of the coarse grid used for singular points.
    pub singularity_cell: usize,
    /// Tolerance in degrees for Poincaré index classification.
    pub poincare_tolerance: f32,
    /// Distance in pixels of the four ROI probes around a ridge ending.
    pub border_probe: usize,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        EnhanceConfig {
            block_size: 16,
            segment_threshold: 0.1,
            gradient_sigma: 1.0,
            orientation_sigma: 5.0,
            gabor_sigma: 4.0,
            min_wavelength: 3.0,
            max_wavelength: 25.0,
            default_wavelength: 9.0,
            orientation_bins: 32,
            min_enhanced_spatial: 0.35,
            singularity_cell: 8,
            poincare_tolerance: 1.0,
            border_probe: 15,
        }
    }
}

/// Every tolerance the core uses, passed to each top-level call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Templates with fewer minutiae are rejected.
    pub min_minutiae: usize,
    /// Neighbors per minutia in the local descriptor.
    pub k_neighbors: usize,
    /// Cores both templates need for core-aligned matching.
    pub minimum_cores: usize,
    /// Pixels a translated probe core may be off from a base core.
    pub core_distance_tolerance: f32,
    /// Base minutia distance tolerance in pixels (D₀).
    pub match_distance_tolerance: f32,
    /// Degrees. Neither strategy compares minutia directions, so this is
    /// only carried through configuration.
    pub match_angle_tolerance: f32,
    /// Distance band in pixels over which the minutia tolerance grows (A).
    pub area_tolerance: f32,
    pub local_ratio_tolerance: f32,
    /// Degrees.
    pub local_angle_tolerance: f32,
    /// Extra edge-length slack for integer pixel rounding in tree growth.
    pub quantization_slack: f32,
    /// Degrees two relative edge directions may differ in tree growth.
    pub quadrant_tolerance: f32,
    pub quality_register: QualityThresholds,
    pub quality_verify: QualityThresholds,
    pub enhance: EnhanceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_minutiae: 21,
            k_neighbors: 5,
            minimum_cores: 2,
            core_distance_tolerance: 0.0,
            match_distance_tolerance: 1.0,
            match_angle_tolerance: 1.5,
            area_tolerance: 60.0,
            local_ratio_tolerance: 0.5,
            local_angle_tolerance: 1.5,
            quantization_slack: std::f32::consts::SQRT_2,
            quadrant_tolerance: 45.0,
            quality_register: QualityThresholds::REGISTER,
            quality_verify: QualityThresholds::VERIFY,
            enhance: EnhanceConfig::default(),
        }
    }
}

impl Config {
    /// Defaults with the lower minutia floor used for authentication-only
    /// call sites.
    pub fn verify_only() -> Self {
        Config {
            min_minutiae: 12,
            ..Default::default()
        }
    }

    pub fn quality_thresholds(&self, purpose: Purpose) -> QualityThresholds {
        match purpose {
            Purpose::Enroll => self.quality_register,
            Purpose::Verify => self.quality_verify,
        }
    }

    /// Distance-dependent minutia tolerance: (⌊d/A⌋ + 1)·D₀.
    pub fn distance_tolerance(&self, d: f32) -> f32 {
        let bands = if self.area_tolerance > 0.0 {
            (d / self.area_tolerance).floor()
        } else {
            0.0
        };
        (bands + 1.0) * self.match_distance_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.min_minutiae, 21);
        assert_eq!(c.k_neighbors, 5);
        assert_eq!(c.minimum_cores, 2);
        assert_eq!(c.quality_register, QualityThresholds { spectral: 0.62, spatial: 0.35 });
        assert_eq!(c.quality_verify, QualityThresholds { spectral: 0.52, spatial: 0.35 });
        assert_eq!(Config::verify_only().min_minutiae, 12);
    }

    #[test]
    fn test_distance_tolerance_bands() {
        let c = Config::default();
        assert_eq!(c.distance_tolerance(0.0), 1.0);
        assert_eq!(c.distance_tolerance(59.9), 1.0);
        assert_eq!(c.distance_tolerance(60.0), 2.0);
        assert_eq!(c.distance_tolerance(130.0), 3.0);
    }

    #[test]
    fn test_thresholds_by_purpose() {
        let c = Config::default();
        let t = c.quality_thresholds(Purpose::Verify);
        assert!(t.accepts(0.55, 0.4));
        assert!(!c.quality_thresholds(Purpose::Enroll).accepts(0.55, 0.4));
    }
}
