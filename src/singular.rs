// singular.rs — Singular points from the Poincaré index.
//
// The orientation field is averaged over a coarse grid of square cells.
// For each cell, walk the eight surrounding cells clockwise from north and
// sum the orientation change between consecutive cells, each change
// folded into (−90°, 90°] since orientations are axial:
//
//   I = Σ fold(θ_{k+1} − θ_k)
//
//   I ≈ +180°  delta
//   I ≈ −180°  loop
//   I ≈ +360°  whorl
//
// A cell is only examined when its whole 5×5 cell neighborhood lies in
// the ROI (a cell is in the ROI when its center pixel is). One singularity
// usually shows up in up to four adjacent cells; a detection next to an
// already accepted point is suppressed.

use tracing::{debug, trace};

use crate::orientation::OrientationField;
use crate::template::{CoreKind, CorePoint};
use crate::thinning::CLOCKWISE;

/// Fold an orientation difference in degrees into (−90°, 90°].
#[inline]
pub fn fold_difference(d: f32) -> f32 {
    let mut d = d;
    while d > 90.0 {
        d -= 180.0;
    }
    while d <= -90.0 {
        d += 180.0;
    }
    d
}

/// Poincaré index (degrees) of a closed walk over axial orientations.
pub fn poincare_index(ring: &[f32]) -> f32 {
    (0..ring.len())
        .map(|k| fold_difference(ring[(k + 1) % ring.len()] - ring[k]))
        .sum()
}

/// Singularity type for an index, `None` when not within `tolerance` of
/// any of them.
pub fn classify_index(index: f32, tolerance: f32) -> Option<CoreKind> {
    if (index - 180.0).abs() <= tolerance {
        Some(CoreKind::Delta)
    } else if (index + 180.0).abs() <= tolerance {
        Some(CoreKind::Loop)
    } else if (index - 360.0).abs() <= tolerance {
        Some(CoreKind::Whorl)
    } else {
        None
    }
}

/// Coarse orientation grid: one doubled-angle mean per cell, in degrees.
struct CellField {
    cols: usize,
    rows: usize,
    cell: usize,
    /// `None` when the cell center is outside the ROI.
    angles: Vec<Option<f32>>,
}

impl CellField {
    fn new(field: &OrientationField, cell: usize) -> Self {
        let cols = field.width() / cell;
        let rows = field.height() / cell;
        let mut angles = Vec::with_capacity(cols * rows);
        for cy in 0..rows {
            for cx in 0..cols {
                let (px, py) = (cx * cell + cell / 2, cy * cell + cell / 2);
                let angle = if field.mask().get(px, py) {
                    field
                        .average(cx * cell, cy * cell, (cx + 1) * cell, (cy + 1) * cell)
                        .map(f32::to_degrees)
                } else {
                    None
                };
                angles.push(angle);
            }
        }
        CellField {
            cols,
            rows,
            cell,
            angles,
        }
    }

    fn at(&self, cx: isize, cy: isize) -> Option<f32> {
        if cx < 0 || cy < 0 || cx as usize >= self.cols || cy as usize >= self.rows {
            return None;
        }
        self.angles[cy as usize * self.cols + cx as usize]
    }

    fn neighborhood_in_roi(&self, cx: isize, cy: isize) -> bool {
        (-2..=2).all(|dy| (-2..=2).all(|dx| self.at(cx + dx, cy + dy).is_some()))
    }

    fn ring(&self, cx: isize, cy: isize) -> Option<[f32; 8]> {
        let mut ring = [0.0f32; 8];
        for (slot, &(dx, dy)) in ring.iter_mut().zip(CLOCKWISE.iter()) {
            *slot = self.at(cx + dx, cy + dy)?;
        }
        Some(ring)
    }
}

/// Detect cores, deltas and whorls. Ids are assigned 0.. in raster order
/// over the cells; each point sits at its cell's center pixel.
pub fn detect_singular_points(field: &OrientationField, cell: usize, tolerance: f32) -> Vec<CorePoint> {
    assert!(cell > 0, "cell size must be > 0");
    let grid = CellField::new(field, cell);
    // Cells of accepted points.
    let mut accepted: Vec<(isize, isize)> = Vec::new();
    let mut out = Vec::new();

    for cy in 0..grid.rows as isize {
        for cx in 0..grid.cols as isize {
            if !grid.neighborhood_in_roi(cx, cy) {
                continue;
            }
            let Some(ring) = grid.ring(cx, cy) else {
                continue;
            };
            let index = poincare_index(&ring);
            let Some(kind) = classify_index(index, tolerance) else {
                continue;
            };
            let adjacent = accepted
                .iter()
                .any(|&(ax, ay)| (ax - cx).abs() <= 1 && (ay - cy).abs() <= 1);
            if adjacent {
                trace!("{:?} at cell ({}, {}) merged into a neighbor", kind, cx, cy);
                continue;
            }
            let Some(angle) = grid.at(cx, cy) else {
                continue;
            };
            accepted.push((cx, cy));
            let x = cx as usize * grid.cell + grid.cell / 2;
            let y = cy as usize * grid.cell + grid.cell / 2;
            let angle = if angle >= 180.0 { 0.0 } else { angle };
            out.push(CorePoint::new(out.len() as u32, x as u16, y as u16, angle, kind));
        }
    }

    debug!(
        "Detected {} singular points ({} loops, {} deltas, {} whorls)",
        out.len(),
        out.iter().filter(|c| c.kind == CoreKind::Loop).count(),
        out.iter().filter(|c| c.kind == CoreKind::Delta).count(),
        out.iter().filter(|c| c.kind == CoreKind::Whorl).count()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    /// Field θ = s·φ around (cx, cy), φ the polar angle in image coordinates.
    fn spiral_field(size: usize, cx: f32, cy: f32, s: f32) -> OrientationField {
        let angles = Image::from_fn(size, size, |x, y| s * (y as f32 - cy).atan2(x as f32 - cx));
        OrientationField::from_parts(angles, Image::filled(size, size, true))
    }

    #[test]
    fn test_fold_difference() {
        assert_eq!(fold_difference(100.0), -80.0);
        assert_eq!(fold_difference(-90.0), 90.0);
        assert_eq!(fold_difference(90.0), 90.0);
        assert_eq!(fold_difference(-170.0), 10.0);
    }

    #[test]
    fn test_uniform_ring_has_zero_index() {
        assert_eq!(poincare_index(&[30.0; 8]), 0.0);
        assert_eq!(classify_index(0.0, 1.0), None);
    }

    #[test]
    fn test_classify_index() {
        assert_eq!(classify_index(180.4, 1.0), Some(CoreKind::Delta));
        assert_eq!(classify_index(-179.5, 1.0), Some(CoreKind::Loop));
        assert_eq!(classify_index(360.0, 1.0), Some(CoreKind::Whorl));
        assert_eq!(classify_index(178.0, 1.0), None);
    }

    #[test]
    fn test_half_turn_field_gives_one_point() {
        let field = spiral_field(96, 48.0, 48.0, 0.5);
        let points = detect_singular_points(&field, 8, 1.0);
        assert_eq!(points.len(), 1, "{points:?}");
        assert_eq!(points[0].kind, CoreKind::Delta);
        assert_eq!((points[0].x, points[0].y), (44, 44));
        assert_eq!(points[0].id, 0);
    }

    #[test]
    fn test_reverse_half_turn_is_loop() {
        let field = spiral_field(96, 48.0, 48.0, -0.5);
        let points = detect_singular_points(&field, 8, 1.0);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].kind, CoreKind::Loop);
    }

    #[test]
    fn test_full_turn_ring_is_whorl() {
        let ring: Vec<f32> = (0..8).map(|k| (k as f32 * 45.0) % 180.0).collect();
        let index = poincare_index(&ring);
        assert!((index - 360.0).abs() < 1e-3);
        assert_eq!(classify_index(index, 1.0), Some(CoreKind::Whorl));
    }

    #[test]
    fn test_singularity_near_roi_edge_skipped() {
        let angles = Image::from_fn(96, 96, |x, y| 0.5 * (y as f32 - 48.0).atan2(x as f32 - 48.0));
        let roi = Image::from_fn(96, 96, |x, _| x < 56);
        let field = OrientationField::from_parts(angles, roi);
        assert!(detect_singular_points(&field, 8, 1.0).is_empty());
    }
}
