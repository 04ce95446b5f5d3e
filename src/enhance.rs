// enhance.rs — Ridge enhancer.
//
// Runs the fixed enhancement pipeline on a raw sample:
//
//   1. Normalize       local mean 0 / variance 1, ridges positive
//   2. Segment         block-variance ROI on the raw intensities
//   3. Orient          structure-tensor orientation inside the ROI
//   4. Frequency       per-block ridge wavelength
//   5. Gabor filter    per-pixel oriented band-pass
//   6. Binarize        threshold at the block mean of the ROI
//   7. Thin            Zhang–Suen + staircase cleanup
//
// Only the skeleton, orientation field and ROI survive; every other grid
// is dropped before returning.

use tracing::debug;

use crate::config::EnhanceConfig;
use crate::decode::Sample;
use crate::error::{FingerprintError, Result};
use crate::frequency::estimate_wavelengths;
use crate::image::{Image, Pixel};
use crate::normalize::normalize;
use crate::orientation::{estimate_orientation, OrientationField};
use crate::quality::spatial_quality;
use crate::ridge_filter::gabor_enhance;
use crate::segment::segment;
use crate::thinning::{binarize, thin};

/// Output of the enhancer: a one-pixel skeleton inside the ROI, plus the
/// orientation field and ROI it was computed with.
#[derive(Debug, Clone)]
pub struct Enhanced {
    pub skeleton: Image<bool>,
    pub orientation: OrientationField,
    pub roi: Image<bool>,
}

fn is_uniform<T: Pixel>(img: &Image<T>) -> bool {
    match img.as_slice().split_first() {
        Some((first, rest)) => rest.iter().all(|v| v == first),
        None => true,
    }
}

/// Enhance `sample` into a ridge skeleton.
///
/// Fails with `VoidImage` when nothing is left to thin and with
/// `EnhancementFailed` when the filtered image lost its ridge texture.
pub fn enhance(sample: &Sample, config: &EnhanceConfig) -> Result<Enhanced> {
    let raw = sample.image();
    let normalized = normalize(raw, config.block_size);
    let roi = segment(raw, config.block_size, config.segment_threshold);

    let orientation = estimate_orientation(
        &normalized,
        &roi,
        config.gradient_sigma,
        config.orientation_sigma,
    );
    let wavelengths = estimate_wavelengths(
        &normalized,
        &orientation,
        config.block_size,
        config.min_wavelength,
        config.max_wavelength,
        config.default_wavelength,
    );
    let enhanced = gabor_enhance(
        &normalized,
        &orientation,
        &wavelengths,
        config.orientation_bins,
        config.gabor_sigma,
    );
    drop(normalized);

    if is_uniform(&enhanced) {
        debug!("Enhancement produced a uniform image");
        return Err(FingerprintError::VoidImage);
    }

    let spatial = spatial_quality(&enhanced);
    if spatial < config.min_enhanced_spatial {
        debug!(
            "Enhancement failed: spatial quality {:.3} < {:.3}",
            spatial, config.min_enhanced_spatial
        );
        return Err(FingerprintError::EnhancementFailed { spatial });
    }

    let binary = binarize(&enhanced, &roi, config.block_size);
    drop(enhanced);
    if is_uniform(&binary) {
        debug!("Binarized image is uniform, nothing to thin");
        return Err(FingerprintError::VoidImage);
    }

    let skeleton = thin(&binary);
    debug!(
        "Enhanced sample: ROI {} px, skeleton {} px, spatial {:.3}",
        roi.count_set(),
        skeleton.count_set(),
        spatial
    );

    Ok(Enhanced {
        skeleton,
        orientation,
        roi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn stripes(w: usize, h: usize, period: f32) -> Sample {
        Sample::from_image(Image::from_fn(w, h, |x, _| {
            (128.0 - 90.0 * (2.0 * PI * x as f32 / period).cos()) as u8
        }))
    }

    #[test]
    fn test_flat_sample_is_void() {
        let sample = Sample::from_image(Image::filled(64, 64, 128u8));
        let err = enhance(&sample, &EnhanceConfig::default()).unwrap_err();
        assert_eq!(err, FingerprintError::VoidImage);
    }

    #[test]
    fn test_stripes_thin_to_vertical_lines() {
        let sample = stripes(96, 96, 9.0);
        let out = enhance(&sample, &EnhanceConfig::default()).unwrap();

        // Skeleton only inside the ROI.
        for (x, y, v) in out.skeleton.pixels() {
            if v {
                assert!(out.roi.get(x, y));
            }
        }
        // Roughly one skeleton pixel per period across a middle row.
        let row: usize = (16..80).filter(|&x| out.skeleton.get(x, 48)).count();
        assert!((6..=8).contains(&row), "{row} skeleton pixels on row 48");
        // Vertical ridges.
        let theta = out.orientation.get(48, 48).unwrap();
        assert!((theta - PI / 2.0).abs() < 0.1, "orientation {theta}");
    }
}
