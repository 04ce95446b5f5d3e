// pipeline.rs — Sample-to-template pipeline and verification.
//
// Ties every stage together into the calls an enrollment or login service
// makes:
//
//   1. Decode the raw (optionally nibble-packed) buffer into a Sample
//   2. Assess spectral and spatial quality for the purpose
//   3. Enhance: normalize, segment, orient, estimate wavelength, Gabor
//      filter, binarize, thin
//   4. Extract minutiae and singular points from the skeleton
//   5. Build minutia neighborhoods, stamp the quality scalars
//   6. (verify only) Match the probe template against the stored one
//
// Intermediate grids live only inside `extract`; nothing carries over
// between calls, so one Pipeline can serve any number of threads.

use tracing::debug;

use crate::config::{Config, Purpose};
use crate::decode::{decode, Sample};
use crate::descriptor::build_descriptors;
use crate::enhance::enhance;
use crate::error::Result;
use crate::extract::extract_from;
use crate::matcher::{match_templates, MatchResult, Strategy};
use crate::quality::assess_quality;
use crate::template::FingerprintTemplate;

/// Enrollment and verification front door.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Template of a decoded sample, quality-gated for `purpose`.
    pub fn extract(&self, sample: &Sample, purpose: Purpose) -> Result<FingerprintTemplate> {
        let quality = assess_quality(sample, purpose, &self.config)?;

        let enhanced = enhance(sample, &self.config.enhance)?;
        debug!(
            "Enhanced {}x{}: {} ROI pixels, {} skeleton pixels",
            sample.width(),
            sample.height(),
            enhanced.roi.count_set(),
            enhanced.skeleton.count_set()
        );

        let template = extract_from(&enhanced, &self.config)?;
        drop(enhanced);

        let template = build_descriptors(template, self.config.k_neighbors)?
            .with_quality(quality.spectral, quality.spatial);
        template.validate(sample.width(), sample.height())?;
        Ok(template)
    }

    /// Enrollment template from a raw buffer, at the stricter quality bar.
    pub fn enroll(&self, buffer: &[u8], width: usize, height: usize, packed: bool) -> Result<FingerprintTemplate> {
        let sample = decode(buffer, width, height, packed)?;
        self.extract(&sample, Purpose::Enroll)
    }

    /// Verification probe template from a raw buffer.
    pub fn probe(&self, buffer: &[u8], width: usize, height: usize, packed: bool) -> Result<FingerprintTemplate> {
        let sample = decode(buffer, width, height, packed)?;
        self.extract(&sample, Purpose::Verify)
    }

    /// Probe a raw buffer and match it against `stored`.
    ///
    /// Sample problems (size, quality, too few minutiae) are errors; a probe
    /// that is fine but belongs to another finger is `NoMatch`.
    pub fn verify(
        &self,
        buffer: &[u8],
        width: usize,
        height: usize,
        packed: bool,
        stored: &FingerprintTemplate,
        strategy: Strategy,
    ) -> Result<MatchResult> {
        let probe = self.probe(buffer, width, height, packed)?;
        self.verify_template(&probe, stored, strategy)
    }

    /// Match an already extracted probe against `stored`.
    pub fn verify_template(
        &self,
        probe: &FingerprintTemplate,
        stored: &FingerprintTemplate,
        strategy: Strategy,
    ) -> Result<MatchResult> {
        match_templates(stored, probe, strategy, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FingerprintError;

    #[test]
    fn test_size_mismatch_is_malformed() {
        let p = Pipeline::default();
        let err = p.enroll(&[0u8; 10], 4, 4, false).unwrap_err();
        assert!(matches!(err, FingerprintError::MalformedInput(_)));
    }

    #[test]
    fn test_flat_sample_is_poor_quality() {
        let p = Pipeline::default();
        let buffer = vec![0x88u8; 64 * 64 / 2];
        let err = p.probe(&buffer, 64, 64, true).unwrap_err();
        assert!(matches!(err, FingerprintError::PoorQuality { .. }), "{err}");
    }

    #[test]
    fn test_config_is_kept() {
        let p = Pipeline::new(Config::verify_only());
        assert_eq!(p.config().min_minutiae, 12);
    }
}
