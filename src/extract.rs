// extract.rs — Feature extractor: minutiae and singular points.

use tracing::debug;

use crate::config::Config;
use crate::enhance::Enhanced;
use crate::error::{FingerprintError, Result};
use crate::image::Image;
use crate::minutiae::detect_minutiae;
use crate::orientation::OrientationField;
use crate::singular::detect_singular_points;
use crate::template::FingerprintTemplate;

/// Locate minutiae and singular points on an enhanced skeleton.
///
/// The template comes back without neighborhoods and with zero quality
/// scalars; `build_descriptors` and `with_quality` fill those in.
pub fn extract_features(
    skeleton: &Image<bool>,
    orientation: &OrientationField,
    roi: &Image<bool>,
    config: &Config,
) -> Result<FingerprintTemplate> {
    let minutiae = detect_minutiae(skeleton, orientation, roi, config.enhance.border_probe);
    if minutiae.len() < config.min_minutiae {
        debug!(
            "Rejecting template: {} minutiae, {} required",
            minutiae.len(),
            config.min_minutiae
        );
        return Err(FingerprintError::TooFewMinutiae {
            found: minutiae.len(),
            required: config.min_minutiae,
        });
    }

    let cores = detect_singular_points(
        orientation,
        config.enhance.singularity_cell,
        config.enhance.poincare_tolerance,
    );
    let template = FingerprintTemplate::new(minutiae, cores);
    template.validate_in_roi(roi)?;

    debug!(
        "Extracted {} minutiae and {} singular points",
        template.minutiae().len(),
        template.cores().len()
    );
    Ok(template)
}

/// `extract_features` on the output of `enhance`.
pub fn extract_from(enhanced: &Enhanced, config: &Config) -> Result<FingerprintTemplate> {
    extract_features(&enhanced.skeleton, &enhanced.orientation, &enhanced.roi, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MinutiaKind;

    /// Short horizontal segments, each contributing two endings.
    fn dashes(count: usize) -> Image<bool> {
        let mut img = Image::new(120, 120);
        for i in 0..count {
            let y = 20 + 8 * (i / 3);
            let x0 = 20 + 30 * (i % 3);
            for x in x0..x0 + 12 {
                img.set(x, y, true);
            }
        }
        img
    }

    #[test]
    fn test_too_few_minutiae() {
        let sk = dashes(3);
        let roi = Image::filled(120, 120, true);
        let field = OrientationField::uniform(0.0, roi.clone());
        let err = extract_features(&sk, &field, &roi, &Config::default()).unwrap_err();
        assert_eq!(err, FingerprintError::TooFewMinutiae { found: 6, required: 21 });
    }

    #[test]
    fn test_extracts_endings_in_raster_order() {
        let sk = dashes(9);
        let roi = Image::filled(120, 120, true);
        let field = OrientationField::uniform(0.0, roi.clone());
        let config = Config {
            min_minutiae: 12,
            ..Default::default()
        };
        let t = extract_features(&sk, &field, &roi, &config).unwrap();
        assert_eq!(t.minutiae().len(), 18);
        assert!(t.minutiae().iter().all(|m| m.kind == MinutiaKind::Ending));
        assert!(t.cores().is_empty());
        for (i, m) in t.minutiae().iter().enumerate() {
            assert_eq!(m.id as usize, i);
        }
        assert_eq!((t.minutiae()[0].x, t.minutiae()[0].y), (20, 20));
        assert_eq!((t.minutiae()[1].x, t.minutiae()[1].y), (31, 20));
    }
}
