// descriptor.rs — Rotation- and translation-invariant minutia neighborhoods.
//
// Each minutia M is described by its K nearest minutiae. For every pair
// (A, B) of those neighbors, A the nearer one, one TupleDescriptor records
//
//   ratio          = max(|MA|, |MB|) / min(|MA|, |MB|)
//   interior_angle = angle of triangle MAB at M, degrees
//   kinds of A and B
//
// Interior angles come from the pairwise line slopes, which only give the
// acute angle between two lines; parallel lines count as 90°. The three
// angles are accepted when they already sum to 180°. Otherwise the triangle
// has an obtuse vertex, and supplementing exactly one angle (tried at M,
// then A, then B) restores the sum. If no single supplement works, as for
// collinear points, the triangle falls back to (60°, 60°, 60°). All
// geometry is done in f64.

use std::borrow::Cow;

use tracing::warn;

use crate::error::{FingerprintError, Result};
use crate::template::{FingerprintTemplate, MinutiaKind, TupleDescriptor};

/// Triangle angle sums within this many degrees of 180° are accepted.
const ANGLE_SUM_TOLERANCE: f64 = 1e-3;
/// Edge lengths below this are treated as coincident points.
const LENGTH_EPSILON: f64 = 1e-9;
/// Line pairs closer than this many degrees to parallel are parallel.
const PARALLEL_EPSILON: f64 = 1e-9;

/// Acute angle in degrees between the lines p→q and p→r. Parallel and
/// degenerate line pairs give 90°.
pub fn line_angle(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> f64 {
    if (q.0 - p.0).hypot(q.1 - p.1) <= LENGTH_EPSILON || (r.0 - p.0).hypot(r.1 - p.1) <= LENGTH_EPSILON {
        return 90.0;
    }
    let a1 = (q.1 - p.1).atan2(q.0 - p.0);
    let a2 = (r.1 - p.1).atan2(r.0 - p.0);
    let d = (a1 - a2).abs().to_degrees() % 180.0;
    let acute = if d > 90.0 { 180.0 - d } else { d };
    if acute <= PARALLEL_EPSILON {
        90.0
    } else {
        acute
    }
}

/// Interior angles (owner, a, b) of the triangle, resolved by the policy
/// above.
pub fn interior_angles(owner: (f64, f64), a: (f64, f64), b: (f64, f64)) -> [f64; 3] {
    let acute = [line_angle(owner, a, b), line_angle(a, owner, b), line_angle(b, owner, a)];
    let sums_to_half_turn = |angles: &[f64; 3]| (angles.iter().sum::<f64>() - 180.0).abs() <= ANGLE_SUM_TOLERANCE;

    if sums_to_half_turn(&acute) {
        return acute;
    }
    for i in 0..3 {
        let mut flipped = acute;
        flipped[i] = 180.0 - flipped[i];
        if sums_to_half_turn(&flipped) {
            return flipped;
        }
    }
    warn!("Unresolvable triangle {:?} {:?} {:?}, using 60/60/60", owner, a, b);
    [60.0, 60.0, 60.0]
}

/// Descriptor of owner M with neighbors A (nearer) and B.
pub fn triangle_descriptor(
    owner_id: u32,
    owner: (f64, f64),
    a: (f64, f64, MinutiaKind),
    b: (f64, f64, MinutiaKind),
) -> Result<TupleDescriptor> {
    let da = (a.0 - owner.0).hypot(a.1 - owner.1);
    let db = (b.0 - owner.0).hypot(b.1 - owner.1);
    let (long, short) = if da >= db { (da, db) } else { (db, da) };
    let ratio = if long <= LENGTH_EPSILON {
        1.0
    } else {
        long / short.max(LENGTH_EPSILON)
    };

    let angle = interior_angles(owner, (a.0, a.1), (b.0, b.1))[0];
    if !(0.0..=180.0).contains(&angle) {
        return Err(FingerprintError::WrongAngles);
    }
    Ok(TupleDescriptor {
        owner_id,
        ratio: ratio as f32,
        interior_angle: angle as f32,
        neighbor_a_kind: a.2,
        neighbor_b_kind: b.2,
    })
}

/// Indices of the `k` points nearest to `points[owner]` among `candidates`,
/// nearest first, ties by candidate order. The owner itself is skipped.
pub fn nearest_neighbors(points: &[(f64, f64, MinutiaKind)], owner: usize, candidates: &[usize], k: usize) -> Vec<usize> {
    let (ox, oy, _) = points[owner];
    let mut by_distance: Vec<(f64, usize)> = candidates
        .iter()
        .filter(|&&i| i != owner)
        .map(|&i| ((points[i].0 - ox).hypot(points[i].1 - oy), i))
        .collect();
    // Stable sort keeps candidate order on equal distances.
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
    by_distance.into_iter().take(k).map(|(_, i)| i).collect()
}

/// Neighborhood of `points[owner]` built from its `k` nearest points among
/// `candidates`.
pub fn describe_point(
    points: &[(f64, f64, MinutiaKind)],
    owner: usize,
    owner_id: u32,
    candidates: &[usize],
    k: usize,
) -> Result<Vec<TupleDescriptor>> {
    let near = nearest_neighbors(points, owner, candidates, k);
    let (ox, oy, _) = points[owner];
    let mut out = Vec::with_capacity(near.len() * near.len().saturating_sub(1) / 2);
    for (i, &a) in near.iter().enumerate() {
        for &b in &near[i + 1..] {
            out.push(triangle_descriptor(owner_id, (ox, oy), points[a], points[b])?);
        }
    }
    Ok(out)
}

/// Neighborhoods for a bare point set, owner id = index.
pub fn describe_points(points: &[(f64, f64, MinutiaKind)], k: usize) -> Result<Vec<Vec<TupleDescriptor>>> {
    let all: Vec<usize> = (0..points.len()).collect();
    (0..points.len())
        .map(|i| describe_point(points, i, i as u32, &all, k))
        .collect()
}

/// Attach a neighborhood to every minutia of `template`, replacing any it
/// already had. Deterministic, so applying it twice changes nothing.
pub fn build_descriptors(template: FingerprintTemplate, k: usize) -> Result<FingerprintTemplate> {
    let mut template = template;
    let points: Vec<(f64, f64, MinutiaKind)> = template
        .minutiae()
        .iter()
        .map(|m| (m.x as f64, m.y as f64, m.kind))
        .collect();
    let all: Vec<usize> = (0..points.len()).collect();
    for (i, m) in template.minutiae_mut().iter_mut().enumerate() {
        m.neighborhood = describe_point(&points, i, m.id, &all, k)?;
    }
    Ok(template)
}

/// `template` itself when every minutia is described, otherwise a described
/// copy.
pub fn ensure_descriptors(template: &FingerprintTemplate, k: usize) -> Result<Cow<'_, FingerprintTemplate>> {
    if template.has_descriptors() {
        Ok(Cow::Borrowed(template))
    } else {
        build_descriptors(template.clone(), k).map(Cow::Owned)
    }
}
