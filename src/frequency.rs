// frequency.rs — Per-block ridge wavelength.
//
// For each ROI block, an oriented window (two blocks long across the
// ridges, one block wide along them) is sampled and collapsed along the
// ridge direction into a 1D "x-signature". Ridges show up as peaks; the
// mean spacing between the first and last peak is the wavelength.
//
// Blocks without a plausible estimate (too few peaks, spacing outside the
// configured range) borrow the mean of their valid neighbors, then the
// mean of all valid blocks, then the default.

use std::f32::consts::FRAC_PI_2;

use tracing::debug;

use crate::blocks::BlockGrid;
use crate::image::{interpolate_bilinear, Image};
use crate::orientation::OrientationField;

/// Ridge wavelength (pixels) for every block of a grid.
#[derive(Debug, Clone)]
pub struct WavelengthMap {
    grid: BlockGrid,
    values: Vec<f32>,
}

impl WavelengthMap {
    /// Wavelength of the block containing (x, y).
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        let (bx, by) = self.grid.block_of(x, y);
        self.values[self.grid.index(bx, by)]
    }

    pub fn block(&self, bx: usize, by: usize) -> f32 {
        self.values[self.grid.index(bx, by)]
    }

    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }
}

/// Project the window centered at (cx, cy) onto the ridge normal.
pub fn x_signature(src: &Image<f32>, cx: f32, cy: f32, theta: f32, length: usize, width: usize) -> Vec<f32> {
    let (rs, rc) = theta.sin_cos();
    // Normal to the ridge direction.
    let (ns, nc) = (theta + FRAC_PI_2).sin_cos();
    let half_l = length as f32 / 2.0;
    let half_w = width as f32 / 2.0;

    (0..length)
        .map(|k| {
            let u = k as f32 - half_l;
            let mut acc = 0.0f32;
            for j in 0..width {
                let v = j as f32 - half_w;
                let x = cx + u * nc + v * rc;
                let y = cy + u * ns + v * rs;
                acc += interpolate_bilinear(src, x, y);
            }
            acc / width as f32
        })
        .collect()
}

/// Mean peak spacing of a signature, `None` with fewer than two peaks.
pub fn peak_spacing(signature: &[f32]) -> Option<f32> {
    if signature.len() < 3 {
        return None;
    }
    // Light [1, 2, 1] smoothing against single-sample noise peaks.
    let n = signature.len();
    let smooth: Vec<f32> = (0..n)
        .map(|i| {
            let a = signature[i.saturating_sub(1)];
            let b = signature[(i + 1).min(n - 1)];
            0.25 * a + 0.5 * signature[i] + 0.25 * b
        })
        .collect();

    let peaks: Vec<usize> = (1..n - 1)
        .filter(|&i| smooth[i] > smooth[i - 1] && smooth[i] >= smooth[i + 1] && smooth[i] > 0.0)
        .collect();
    if peaks.len() < 2 {
        return None;
    }
    let first = peaks[0];
    let last = peaks[peaks.len() - 1];
    Some((last - first) as f32 / (peaks.len() - 1) as f32)
}

/// Estimate the ridge wavelength of every block.
pub fn estimate_wavelengths(
    src: &Image<f32>,
    field: &OrientationField,
    block_size: usize,
    min_wavelength: f32,
    max_wavelength: f32,
    default_wavelength: f32,
) -> WavelengthMap {
    let grid = BlockGrid::new(src.width(), src.height(), block_size);
    let n = grid.total_blocks();
    let mut raw: Vec<Option<f32>> = vec![None; n];
    let mut in_roi = vec![false; n];

    for (bx, by) in grid.blocks() {
        let (x0, y0, x1, y1) = grid.bounds(bx, by);
        let Some(theta) = field.average(x0, y0, x1, y1) else {
            continue;
        };
        let i = grid.index(bx, by);
        in_roi[i] = true;
        let (cx, cy) = grid.center(bx, by);
        let sig = x_signature(src, cx as f32, cy as f32, theta, 2 * block_size, block_size);
        raw[i] = peak_spacing(&sig).filter(|l| (min_wavelength..=max_wavelength).contains(l));
    }

    let valid: Vec<f32> = raw.iter().flatten().copied().collect();
    let global = if valid.is_empty() {
        default_wavelength
    } else {
        valid.iter().sum::<f32>() / valid.len() as f32
    };

    let cols = grid.cols() as isize;
    let rows = grid.rows() as isize;
    let mut values = vec![global; n];
    for (bx, by) in grid.blocks() {
        let i = grid.index(bx, by);
        if let Some(l) = raw[i] {
            values[i] = l;
            continue;
        }
        if !in_roi[i] {
            continue;
        }
        let mut sum = 0.0;
        let mut count = 0;
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                let nx = bx as isize + dx;
                let ny = by as isize + dy;
                if nx < 0 || ny < 0 || nx >= cols || ny >= rows {
                    continue;
                }
                if let Some(l) = raw[(ny * cols + nx) as usize] {
                    sum += l;
                    count += 1;
                }
            }
        }
        if count > 0 {
            values[i] = sum / count as f32;
        }
    }

    debug!(
        "Wavelength estimate: {}/{} ROI blocks valid, mean {:.2} px",
        valid.len(),
        in_roi.iter().filter(|&&r| r).count(),
        global
    );
    WavelengthMap { grid, values }
}
