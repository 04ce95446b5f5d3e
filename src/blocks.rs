// blocks.rs — Block tiling and per-block statistics.
//
// The image is divided into square blocks (the last row/column may be
// partial). Quality assessment, segmentation, frequency estimation and
// binarization all work per block; this module owns the indexing so they
// agree on which pixels belong to which block.

use crate::image::{Image, Pixel};

/// Fraction of the largest block variance above which a block counts as
/// textured for spatial quality.
pub const NORMALIZED_VARIANCE_THRESHOLD: f32 = 0.25;

/// Square tiling of a `width × height` image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    cols: usize,
    rows: usize,
    block_size: usize,
    img_w: usize,
    img_h: usize,
}

impl BlockGrid {
    /// # Panics
    /// Panics if `block_size == 0`.
    pub fn new(img_w: usize, img_h: usize, block_size: usize) -> Self {
        assert!(block_size > 0, "block_size must be > 0");
        BlockGrid {
            cols: img_w.div_ceil(block_size),
            rows: img_h.div_ceil(block_size),
            block_size,
            img_w,
            img_h,
        }
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn total_blocks(&self) -> usize {
        self.cols * self.rows
    }

    /// Flat index of block (bx, by).
    #[inline]
    pub fn index(&self, bx: usize, by: usize) -> usize {
        by * self.cols + bx
    }

    /// Block containing pixel (x, y).
    #[inline]
    pub fn block_of(&self, x: usize, y: usize) -> (usize, usize) {
        (x / self.block_size, y / self.block_size)
    }

    /// Pixel range `[x0, x1) × [y0, y1)` covered by block (bx, by).
    pub fn bounds(&self, bx: usize, by: usize) -> (usize, usize, usize, usize) {
        let x0 = bx * self.block_size;
        let y0 = by * self.block_size;
        (
            x0,
            y0,
            (x0 + self.block_size).min(self.img_w),
            (y0 + self.block_size).min(self.img_h),
        )
    }

    /// Center pixel of block (bx, by).
    pub fn center(&self, bx: usize, by: usize) -> (usize, usize) {
        let (x0, y0, x1, y1) = self.bounds(bx, by);
        ((x0 + x1) / 2, (y0 + y1) / 2)
    }

    /// Iterate over all blocks as (bx, by) in raster order.
    pub fn blocks(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows).flat_map(move |by| (0..self.cols).map(move |bx| (bx, by)))
    }

    /// Paint a per-block flag vector onto a full-resolution mask.
    pub fn expand(&self, flags: &[bool]) -> Image<bool> {
        assert_eq!(flags.len(), self.total_blocks(), "one flag per block");
        Image::from_fn(self.img_w, self.img_h, |x, y| {
            let (bx, by) = self.block_of(x, y);
            flags[self.index(bx, by)]
        })
    }
}

/// Mean and variance of every block.
#[derive(Debug, Clone)]
pub struct BlockStats {
    pub mean: Vec<f32>,
    pub variance: Vec<f32>,
    /// Pixels that contributed (all of them unless a mask was given).
    pub count: Vec<usize>,
}

impl BlockStats {
    /// Compute per-block statistics, optionally restricted to `mask`.
    /// Blocks with no contributing pixel get mean and variance 0.
    pub fn compute<T: Pixel>(img: &Image<T>, grid: &BlockGrid, mask: Option<&Image<bool>>) -> Self {
        let n = grid.total_blocks();
        let mut sum = vec![0.0f64; n];
        let mut sum_sq = vec![0.0f64; n];
        let mut count = vec![0usize; n];

        for (x, y, v) in img.pixels() {
            if let Some(m) = mask {
                if !m.get(x, y) {
                    continue;
                }
            }
            let (bx, by) = grid.block_of(x, y);
            let i = grid.index(bx, by);
            let v = v.to_f32() as f64;
            sum[i] += v;
            sum_sq[i] += v * v;
            count[i] += 1;
        }

        let mut mean = vec![0.0f32; n];
        let mut variance = vec![0.0f32; n];
        for i in 0..n {
            if count[i] > 0 {
                let m = sum[i] / count[i] as f64;
                mean[i] = m as f32;
                variance[i] = (sum_sq[i] / count[i] as f64 - m * m).max(0.0) as f32;
            }
        }
        BlockStats {
            mean,
            variance,
            count,
        }
    }

    /// Largest block variance (0 when every block is flat).
    pub fn max_variance(&self) -> f32 {
        self.variance.iter().copied().fold(0.0, f32::max)
    }

    /// Flags blocks whose variance exceeds `ratio` times the largest one.
    /// All false when every block is flat.
    pub fn textured(&self, ratio: f32) -> Vec<bool> {
        let max = self.max_variance();
        if max <= f32::EPSILON {
            return vec![false; self.variance.len()];
        }
        self.variance.iter().map(|&v| v / max > ratio).collect()
    }

    /// Fraction of blocks whose normalized variance exceeds `ratio`.
    pub fn textured_fraction(&self, ratio: f32) -> f32 {
        if self.variance.is_empty() {
            return 0.0;
        }
        let flags = self.textured(ratio);
        flags.iter().filter(|&&f| f).count() as f32 / flags.len() as f32
    }
}
