// thinning.rs — Binarization and skeletonization.
//
// Binarize: a pixel is ridge when its enhanced value exceeds the mean of
// the ROI pixels in its block.
//
// Thin: Zhang–Suen two-subiteration thinning. Neighbors are named
// clockwise from north:
//
//   P9 P2 P3        NW N NE
//   P8 P1 P4   =    W  P  E
//   P7 P6 P5        SW S SE
//
// A pixel is deleted in a subiteration when
//   2 ≤ B(P1) ≤ 6       (set neighbors)
//   A(P1) = 1           (0→1 transitions around P2..P9,P2)
//   sub 1: P2·P4·P6 = 0 and P4·P6·P8 = 0
//   sub 2: P2·P4·P8 = 0 and P2·P6·P8 = 0
// and passes repeat until neither subiteration deletes anything.
//
// Zhang–Suen leaves 4-connected "staircase" corners two pixels thick. A
// final raster pass deletes a pixel that is a plain ridge continuation
// (crossing number 2), is simple (Yokoi 8-connectivity number 1) and has
// two perpendicular set 4-neighbors.

use tracing::debug;

use crate::blocks::{BlockGrid, BlockStats};
use crate::image::Image;

/// Neighbor offsets clockwise from north: N, NE, E, SE, S, SW, W, NW.
pub const CLOCKWISE: [(isize, isize); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Ring of the eight neighbors of (x, y), clockwise from north. Outside
/// the image counts as unset.
#[inline]
pub fn neighbors(img: &Image<bool>, x: usize, y: usize) -> [bool; 8] {
    let (x, y) = (x as isize, y as isize);
    let mut ring = [false; 8];
    for (slot, &(dx, dy)) in ring.iter_mut().zip(CLOCKWISE.iter()) {
        *slot = img.is_set(x + dx, y + dy);
    }
    ring
}

/// Number of value changes around the closed ring, halved.
#[inline]
pub fn ring_crossings(ring: &[bool; 8]) -> u8 {
    let changes = (0..8).filter(|&k| ring[k] != ring[(k + 1) % 8]).count();
    (changes / 2) as u8
}

/// Yokoi 8-connectivity number. 1 means removing the pixel keeps its
/// neighbors connected.
fn yokoi_n8(ring: &[bool; 8]) -> u8 {
    // Yokoi walks counter-clockwise from east; complement values.
    let [n, ne, e, se, s, sw, w, nw] = ring.map(|v| !v as u8);
    let seq = [e, ne, n, nw, w, sw, s, se];
    let mut total = 0u8;
    for k in [0usize, 2, 4, 6] {
        let a = seq[k];
        let b = seq[(k + 1) % 8];
        let c = seq[(k + 2) % 8];
        total += a - a * b * c;
    }
    total
}

/// Threshold `enhanced` at the mean of each block's ROI pixels.
pub fn binarize(enhanced: &Image<f32>, roi: &Image<bool>, block_size: usize) -> Image<bool> {
    let grid = BlockGrid::new(enhanced.width(), enhanced.height(), block_size);
    let stats = BlockStats::compute(enhanced, &grid, Some(roi));
    Image::from_fn(enhanced.width(), enhanced.height(), |x, y| {
        if !roi.get(x, y) {
            return false;
        }
        let (bx, by) = grid.block_of(x, y);
        enhanced.get(x, y) > stats.mean[grid.index(bx, by)]
    })
}

fn zhang_suen_pass(img: &mut Image<bool>, first: bool) -> usize {
    let mut marked = Vec::new();
    for y in 0..img.height() {
        for x in 0..img.width() {
            if !img.get(x, y) {
                continue;
            }
            let ring = neighbors(img, x, y);
            let [p2, p3, p4, p5, p6, p7, p8, p9] = ring;
            let b = ring.iter().filter(|&&v| v).count();
            if !(2..=6).contains(&b) {
                continue;
            }
            let seq = [p2, p3, p4, p5, p6, p7, p8, p9, p2];
            let a = seq.windows(2).filter(|w| !w[0] && w[1]).count();
            if a != 1 {
                continue;
            }
            let keep = if first {
                (p2 && p4 && p6) || (p4 && p6 && p8)
            } else {
                (p2 && p4 && p8) || (p2 && p6 && p8)
            };
            if !keep {
                marked.push((x, y));
            }
        }
    }
    for &(x, y) in &marked {
        img.set(x, y, false);
    }
    marked.len()
}

/// Zhang–Suen thinning until no pixel changes.
pub fn zhang_suen(src: &Image<bool>) -> Image<bool> {
    let mut img = src.clone();
    let mut passes = 0;
    loop {
        let removed = zhang_suen_pass(&mut img, true) + zhang_suen_pass(&mut img, false);
        passes += 1;
        if removed == 0 {
            break;
        }
    }
    debug!("Zhang-Suen thinning converged after {} passes", passes);
    img
}

/// Delete staircase corner pixels in place; returns how many were removed.
pub fn remove_staircases(img: &mut Image<bool>) -> usize {
    let mut removed = 0;
    for y in 0..img.height() {
        for x in 0..img.width() {
            if !img.get(x, y) {
                continue;
            }
            let ring = neighbors(img, x, y);
            let (n, e, s, w) = (ring[0], ring[2], ring[4], ring[6]);
            let corner = (n && e) || (e && s) || (s && w) || (w && n);
            if corner && ring_crossings(&ring) == 2 && yokoi_n8(&ring) == 1 {
                img.set(x, y, false);
                removed += 1;
            }
        }
    }
    removed
}

/// One-pixel-thick skeleton of a binary ridge image.
pub fn thin(binary: &Image<bool>) -> Image<bool> {
    let mut skeleton = zhang_suen(binary);
    let removed = remove_staircases(&mut skeleton);
    debug!(
        "Skeleton: {} px after removing {} staircase pixels",
        skeleton.count_set(),
        removed
    );
    skeleton
}
