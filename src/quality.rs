// quality.rs — Spectral and spatial quality of a raw sample.
//
// Spectral quality: a 16-filter quadrature Gabor bank is sampled on a 3×3
// lattice at the quarter points of every foreground block, and the
// energies are summed per filter. Per block, the energy distribution over
// orientations is folded into a doubled-angle resultant
//
//   R_b = | Σ_k E_k · exp(2iθ_k) |
//
// which equals Σ E_k when all energy sits on one orientation and 0 when it
// is spread evenly. The sample score is Σ_b R_b / Σ_b Σ_k E_k over the
// foreground blocks, so strong blocks weigh more than faint ones.
//
// Spatial quality: the fraction of blocks whose variance exceeds 0.25 of
// the largest block variance.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blocks::{BlockGrid, BlockStats, NORMALIZED_VARIANCE_THRESHOLD};
use crate::config::{Config, Purpose};
use crate::decode::Sample;
use crate::error::{FingerprintError, Result};
use crate::gabor::GaborBank;
use crate::image::{Image, Pixel};

/// Block edge used by both quality measures.
pub const QUALITY_BLOCK_SIZE: usize = 16;
/// Blocks below this fraction of the largest variance are background.
pub const FOREGROUND_RATIO: f32 = 0.1;

/// Quality scalars of one sample, both in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub spectral: f32,
    pub spatial: f32,
}

/// Lattice points per block axis at which the bank is sampled.
const SAMPLES_PER_AXIS: usize = 3;

/// Sample positions inside block (bx, by): the quarter points of its pixel
/// range along each axis, row by row.
pub fn block_samples(grid: &BlockGrid, bx: usize, by: usize) -> Vec<(usize, usize)> {
    let (x0, y0, x1, y1) = grid.bounds(bx, by);
    let along = |lo: usize, hi: usize, i: usize| lo + (hi - lo) * (i + 1) / (SAMPLES_PER_AXIS + 1);
    (0..SAMPLES_PER_AXIS)
        .flat_map(|j| (0..SAMPLES_PER_AXIS).map(move |i| (along(x0, x1, i), along(y0, y1, j))))
        .collect()
}

/// Per-filter bank energy of block (bx, by), summed over its samples.
fn block_energies<T: Pixel>(img: &Image<T>, bank: &GaborBank, grid: &BlockGrid, bx: usize, by: usize) -> Vec<f64> {
    let mut energies = vec![0.0f64; bank.len()];
    for (x, y) in block_samples(grid, bx, by) {
        for (total, e) in energies.iter_mut().zip(bank.energies_at(img, x, y)) {
            *total += e as f64;
        }
    }
    energies
}

/// Orientation concentration of the Gabor bank response, in [0, 1].
pub fn spectral_quality<T: Pixel>(img: &Image<T>, bank: &GaborBank) -> f32 {
    let grid = BlockGrid::new(img.width(), img.height(), QUALITY_BLOCK_SIZE);
    let stats = BlockStats::compute(img, &grid, None);
    let foreground = stats.textured(FOREGROUND_RATIO);

    let mut resultant_sum = 0.0f64;
    let mut energy_sum = 0.0f64;
    for (bx, by) in grid.blocks() {
        if !foreground[grid.index(bx, by)] {
            continue;
        }
        let energies = block_energies(img, bank, &grid, bx, by);

        let mut re = 0.0f64;
        let mut im = 0.0f64;
        for (filter, &e) in bank.filters().iter().zip(&energies) {
            let phi = 2.0 * filter.theta as f64;
            re += e * phi.cos();
            im += e * phi.sin();
            energy_sum += e;
        }
        resultant_sum += (re * re + im * im).sqrt();
    }

    if energy_sum <= f64::EPSILON {
        return 0.0;
    }
    ((resultant_sum / energy_sum) as f32).clamp(0.0, 1.0)
}

/// Fraction of textured blocks, in [0, 1].
pub fn spatial_quality<T: Pixel>(img: &Image<T>) -> f32 {
    let grid = BlockGrid::new(img.width(), img.height(), QUALITY_BLOCK_SIZE);
    BlockStats::compute(img, &grid, None).textured_fraction(NORMALIZED_VARIANCE_THRESHOLD)
}

/// Measure both scalars without applying thresholds.
pub fn measure(sample: &Sample) -> QualityReport {
    let bank = GaborBank::default();
    QualityReport {
        spectral: spectral_quality(sample.image(), &bank),
        spatial: spatial_quality(sample.image()),
    }
}

/// Measure and accept or reject the sample for `purpose`.
pub fn assess_quality(sample: &Sample, purpose: Purpose, config: &Config) -> Result<QualityReport> {
    let report = measure(sample);
    let thresholds = config.quality_thresholds(purpose);
    debug!(
        "Quality for {:?}: spectral {:.3} (min {:.2}), spatial {:.3} (min {:.2})",
        purpose, report.spectral, thresholds.spectral, report.spatial, thresholds.spatial
    );
    if !thresholds.accepts(report.spectral, report.spatial) {
        return Err(FingerprintError::PoorQuality {
            spectral: report.spectral,
            spatial: report.spatial,
        });
    }
    Ok(report)
}
