// segment.rs — Region-of-interest mask from block variance.
//
// Background and low-contrast border blocks have little variance; ridge
// blocks have a lot. A block is foreground when its variance exceeds a
// fraction of the strongest block. Single-block holes inside the print
// are filled and isolated foreground blocks dropped, since both come from
// smudges rather than the finger outline.

use tracing::debug;

use crate::blocks::{BlockGrid, BlockStats};
use crate::image::{Image, Pixel};

/// Per-block foreground flags (raster order over `grid`).
pub fn foreground_blocks<T: Pixel>(src: &Image<T>, grid: &BlockGrid, threshold: f32) -> Vec<bool> {
    let stats = BlockStats::compute(src, grid, None);
    let raw = stats.textured(threshold);
    let mut flags = raw.clone();

    let cols = grid.cols() as isize;
    let rows = grid.rows() as isize;
    let at = |bx: isize, by: isize| -> bool {
        bx >= 0 && by >= 0 && bx < cols && by < rows && raw[(by * cols + bx) as usize]
    };

    for (bx, by) in grid.blocks() {
        let (bx, by) = (bx as isize, by as isize);
        let i = (by * cols + bx) as usize;
        if raw[i] {
            let neighbors = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
                .filter(|&(dx, dy)| (dx, dy) != (0, 0) && at(bx + dx, by + dy))
                .count();
            if neighbors == 0 && grid.total_blocks() > 1 {
                flags[i] = false;
            }
        } else if at(bx - 1, by) && at(bx + 1, by) && at(bx, by - 1) && at(bx, by + 1) {
            flags[i] = true;
        }
    }
    flags
}

/// Full-resolution ROI mask: `true` inside the fingerprint area.
pub fn segment<T: Pixel>(src: &Image<T>, block_size: usize, threshold: f32) -> Image<bool> {
    let grid = BlockGrid::new(src.width(), src.height(), block_size);
    let flags = foreground_blocks(src, &grid, threshold);
    let mask = grid.expand(&flags);
    debug!(
        "Segmented ROI: {}/{} blocks foreground ({} px)",
        flags.iter().filter(|&&f| f).count(),
        flags.len(),
        mask.count_set()
    );
    mask
}
