// minutiae.rs — Crossing-number minutia detection on a skeleton.
//
// For a set skeleton pixel P with neighbors p1..p8 clockwise from north,
//
//   CN(P) = ½ · Σ |p_k − p_{k+1}|,   p9 = p1
//
// CN = 1 is a ridge ending, CN = 3 a bifurcation; 2 is a plain ridge
// pixel. Endings near the edge of the print are mostly where the skeleton
// runs out of ROI, not real endings, so each candidate ending probes the
// ROI mask a fixed distance away in the four compass directions and is
// dropped unless all four probes are inside.

use tracing::{debug, trace};

use crate::image::Image;
use crate::orientation::OrientationField;
use crate::template::{Minutia, MinutiaKind};
use crate::thinning::{neighbors, ring_crossings};

/// Crossing number of (x, y) on `skeleton`, in 0..=4.
pub fn crossing_number(skeleton: &Image<bool>, x: usize, y: usize) -> u8 {
    ring_crossings(&neighbors(skeleton, x, y))
}

/// Minutia kind for a crossing number, `None` for non-minutiae.
pub fn classify(cn: u8) -> Option<MinutiaKind> {
    match cn {
        1 => Some(MinutiaKind::Ending),
        3 => Some(MinutiaKind::Bifurcation),
        _ => None,
    }
}

/// Number of ROI probes around (x, y), `distance` pixels away in each
/// compass direction, that land inside the ROI. Outside the image counts
/// as outside the ROI.
pub fn roi_probe_count(roi: &Image<bool>, x: usize, y: usize, distance: usize) -> usize {
    let (x, y, d) = (x as isize, y as isize, distance as isize);
    [(0, -d), (0, d), (d, 0), (-d, 0)]
        .iter()
        .filter(|&&(dx, dy)| roi.is_set(x + dx, y + dy))
        .count()
}

/// Detect minutiae in raster order. Ids are assigned 0.. in that order and
/// angles taken from `field` in degrees. Neighborhoods are left empty.
pub fn detect_minutiae(
    skeleton: &Image<bool>,
    field: &OrientationField,
    roi: &Image<bool>,
    border_probe: usize,
) -> Vec<Minutia> {
    let w = skeleton.width();
    let h = skeleton.height();
    let mut out = Vec::new();
    let mut suppressed = 0usize;
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if !skeleton.get(x, y) || !roi.get(x, y) {
                continue;
            }
            let Some(kind) = classify(crossing_number(skeleton, x, y)) else {
                continue;
            };
            let Some(angle) = field.degrees(x, y) else {
                continue;
            };
            if kind == MinutiaKind::Ending && roi_probe_count(roi, x, y, border_probe) < 4 {
                trace!("Ending at ({}, {}) suppressed near ROI border", x, y);
                suppressed += 1;
                continue;
            }
            let id = out.len() as u32;
            out.push(Minutia::new(id, x as u16, y as u16, angle, kind));
        }
    }

    debug!(
        "Detected {} minutiae ({} endings, {} bifurcations), {} border endings suppressed",
        out.len(),
        out.iter().filter(|m| m.kind == MinutiaKind::Ending).count(),
        out.iter().filter(|m| m.kind == MinutiaKind::Bifurcation).count(),
        suppressed
    );
    out
}
