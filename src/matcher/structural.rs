// structural.rs — Matching by local structure, no alignment needed.
//
// 1. Pairing. Each probe minutia takes the first unclaimed base minutia of
//    the same kind that shares at least two descriptors with it. Two
//    descriptors agree when their ratios and interior angles are within the
//    local tolerances and their neighbor kinds are equal.
// 2. Tree. Pairs are nodes; an edge joins two pairs whose base and probe
//    segments have the same length and the same direction relative to the
//    minutia angles at both ends. A tree is grown breadth first from the
//    first and the best-connected node of every connected component, and
//    from the few best-connected nodes overall. A step u → v with parent p
//    also needs the triangle (p, u, v) to agree in edge ratio and interior
//    angle at u. The largest tree wins.
// 3. Rescue. Minutiae outside the tree are redescribed using tree minutiae
//    as neighbors only, and paired again among themselves. A new pair joins
//    the tree when it is edge-consistent with at least two tree nodes.
//
// All length and angle checks are widened by the integer rounding slack of
// the coordinates involved.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::{axial_difference, distance, Evaluation, Matcher};
use crate::config::Config;
use crate::descriptor::describe_point;
use crate::template::{FingerprintTemplate, Minutia, MinutiaKind, TupleDescriptor};

pub struct Structural;

/// Base and probe index of a paired minutia.
type Pair = (usize, usize);

/// Direction in degrees of the segment a → b.
#[inline]
fn direction(a: (f32, f32), b: (f32, f32)) -> f32 {
    (b.1 - a.1).atan2(b.0 - a.0).to_degrees()
}

/// Worst-case direction error in degrees of a segment of `length` when its
/// endpoints are off by up to `slack` pixels.
#[inline]
fn widening(slack: f32, length: f32) -> f32 {
    if length <= f32::EPSILON {
        90.0
    } else {
        (2.0 * slack / length).atan().to_degrees()
    }
}

/// Interior angle in degrees at `at` of the triangle (at, p, q).
fn angle_at(at: (f32, f32), p: (f32, f32), q: (f32, f32)) -> f32 {
    let d = (direction(at, p) - direction(at, q)).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

fn descriptors_agree(a: &TupleDescriptor, b: &TupleDescriptor, config: &Config) -> bool {
    a.neighbor_a_kind == b.neighbor_a_kind
        && a.neighbor_b_kind == b.neighbor_b_kind
        && (a.ratio - b.ratio).abs() <= config.local_ratio_tolerance
        && (a.interior_angle - b.interior_angle).abs() <= config.local_angle_tolerance
}

/// Descriptors of `a` with a distinct agreeing partner in `b`.
pub(crate) fn shared_descriptors(a: &[TupleDescriptor], b: &[TupleDescriptor], config: &Config) -> usize {
    let mut used = vec![false; b.len()];
    let mut shared = 0;
    for da in a {
        if let Some(j) = (0..b.len()).find(|&j| !used[j] && descriptors_agree(da, &b[j], config)) {
            used[j] = true;
            shared += 1;
        }
    }
    shared
}

/// One side of the comparison: positions, kinds, angles and the current
/// neighborhoods, all indexed like the template's minutiae.
struct Side {
    points: Vec<(f32, f32)>,
    kinds: Vec<MinutiaKind>,
    angles: Vec<f32>,
    neighborhoods: Vec<Vec<TupleDescriptor>>,
}

impl Side {
    fn new(minutiae: &[Minutia]) -> Self {
        Side {
            points: minutiae.iter().map(Minutia::position).collect(),
            kinds: minutiae.iter().map(|m| m.kind).collect(),
            angles: minutiae.iter().map(|m| m.angle).collect(),
            neighborhoods: minutiae.iter().map(|m| m.neighborhood.clone()).collect(),
        }
    }

    /// Replace the neighborhoods of `targets` with ones built only from
    /// `anchors`.
    fn redescribe(&mut self, targets: &[usize], anchors: &[usize], k: usize) {
        let points: Vec<(f64, f64, MinutiaKind)> = self
            .points
            .iter()
            .zip(&self.kinds)
            .map(|(&(x, y), &kind)| (x as f64, y as f64, kind))
            .collect();
        for &t in targets {
            // Descriptors are built from finite coordinates, so this cannot
            // fail; an unresolvable neighborhood just pairs with nothing.
            self.neighborhoods[t] = describe_point(&points, t, t as u32, anchors, k).unwrap_or_default();
        }
    }
}

/// Step 1: pair `probe_set` minutiae with unclaimed `base_set` ones.
fn pair_by_descriptors(
    base: &Side,
    probe: &Side,
    base_set: &[usize],
    probe_set: &[usize],
    claimed: &mut [bool],
    config: &Config,
) -> Vec<Pair> {
    let mut pairs = Vec::new();
    for &p in probe_set {
        let hit = base_set.iter().copied().find(|&b| {
            !claimed[b]
                && base.kinds[b] == probe.kinds[p]
                && shared_descriptors(&probe.neighborhoods[p], &base.neighborhoods[b], config) >= 2
        });
        if let Some(b) = hit {
            trace!("Paired probe minutia {} with base minutia {}", p, b);
            claimed[b] = true;
            pairs.push((b, p));
        }
    }
    pairs
}

/// Whether segments (i, j) agree between base and probe.
fn edge_consistent(base: &Side, probe: &Side, i: Pair, j: Pair, config: &Config) -> bool {
    let (bi, bj) = (base.points[i.0], base.points[j.0]);
    let (pi, pj) = (probe.points[i.1], probe.points[j.1]);
    let db = distance(bi, bj);
    let dp = distance(pi, pj);
    if (db - dp).abs() > config.distance_tolerance(db) + config.quantization_slack {
        return false;
    }
    let slack = config.quadrant_tolerance + widening(config.quantization_slack, db.min(dp));
    let relative_b = direction(bi, bj) - base.angles[i.0];
    let relative_p = direction(pi, pj) - probe.angles[i.1];
    if axial_difference(relative_b, relative_p) > slack {
        return false;
    }
    let relative_b = direction(bj, bi) - base.angles[j.0];
    let relative_p = direction(pj, pi) - probe.angles[j.1];
    axial_difference(relative_b, relative_p) <= slack
}

/// Whether the triangle parent → u → v has the same shape on both sides.
fn step_consistent(base: &Side, probe: &Side, parent: Pair, u: Pair, v: Pair, config: &Config) -> bool {
    let slack = config.quantization_slack;
    let (bp, bu, bv) = (base.points[parent.0], base.points[u.0], base.points[v.0]);
    let (pp, pu, pv) = (probe.points[parent.1], probe.points[u.1], probe.points[v.1]);
    let (b_in, b_out) = (distance(bp, bu), distance(bu, bv));
    let (p_in, p_out) = (distance(pp, pu), distance(pu, pv));
    if b_in <= f32::EPSILON || p_in <= f32::EPSILON {
        return false;
    }

    let ratio_b = b_out / b_in;
    let ratio_p = p_out / p_in;
    let ratio_slack = config.local_ratio_tolerance + ratio_b * (slack / b_out.max(1.0) + slack / b_in.max(1.0));
    if (ratio_b - ratio_p).abs() > ratio_slack {
        return false;
    }

    let angle_slack = config.local_angle_tolerance + widening(slack, b_out) + widening(slack, b_in);
    (angle_at(bu, bp, bv) - angle_at(pu, pp, pv)).abs() <= angle_slack
}

/// Best-connected nodes tried as tree roots besides the per-component ones.
const DEGREE_STARTS: usize = 8;

/// Tree roots over the `n`×`n` adjacency: the first and the highest-degree
/// node of each connected component, then the `DEGREE_STARTS` highest-degree
/// nodes. Searches from different components never overlap, so growing from
/// these stays quadratic in `n`.
fn tree_starts(adjacent: &[bool], n: usize) -> Vec<usize> {
    let degree: Vec<usize> = (0..n)
        .map(|i| adjacent[i * n..(i + 1) * n].iter().filter(|&&a| a).count())
        .collect();

    let mut seen = vec![false; n];
    let mut starts = Vec::new();
    for root in 0..n {
        if seen[root] {
            continue;
        }
        seen[root] = true;
        let mut hub = root;
        let mut stack = vec![root];
        while let Some(u) = stack.pop() {
            if degree[u] > degree[hub] {
                hub = u;
            }
            for v in 0..n {
                if adjacent[u * n + v] && !seen[v] {
                    seen[v] = true;
                    stack.push(v);
                }
            }
        }
        starts.push(root);
        if hub != root {
            starts.push(hub);
        }
    }

    let mut by_degree: Vec<usize> = (0..n).collect();
    by_degree.sort_by(|&a, &b| degree[b].cmp(&degree[a]).then(a.cmp(&b)));
    for &i in by_degree.iter().take(DEGREE_STARTS) {
        if !starts.contains(&i) {
            starts.push(i);
        }
    }
    starts
}

/// Step 2: largest consistent tree over `pairs`, as indices into `pairs`.
fn grow_tree(base: &Side, probe: &Side, pairs: &[Pair], config: &Config) -> Vec<usize> {
    let n = pairs.len();
    let mut adjacent = vec![false; n * n];
    for i in 0..n {
        for j in i + 1..n {
            let ok = edge_consistent(base, probe, pairs[i], pairs[j], config);
            adjacent[i * n + j] = ok;
            adjacent[j * n + i] = ok;
        }
    }

    let mut best: Vec<usize> = Vec::new();
    for start in tree_starts(&adjacent, n) {
        if best.len() == n {
            break;
        }
        let mut visited = vec![false; n];
        visited[start] = true;
        let mut tree = vec![start];
        let mut queue = VecDeque::from([(start, None::<usize>)]);
        while let Some((u, parent)) = queue.pop_front() {
            for v in 0..n {
                if visited[v] || !adjacent[u * n + v] {
                    continue;
                }
                if let Some(p) = parent {
                    if !step_consistent(base, probe, pairs[p], pairs[u], pairs[v], config) {
                        continue;
                    }
                }
                visited[v] = true;
                tree.push(v);
                queue.push_back((v, Some(u)));
            }
        }
        if tree.len() > best.len() {
            best = tree;
        }
    }
    best
}

impl Matcher for Structural {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn evaluate(&self, base: &FingerprintTemplate, probe: &FingerprintTemplate, config: &Config) -> Evaluation {
        let (nb, np) = (base.minutiae().len(), probe.minutiae().len());
        let mut base_side = Side::new(base.minutiae());
        let mut probe_side = Side::new(probe.minutiae());

        let all_base: Vec<usize> = (0..nb).collect();
        let all_probe: Vec<usize> = (0..np).collect();
        let mut claimed = vec![false; nb];
        let mut pairs = pair_by_descriptors(&base_side, &probe_side, &all_base, &all_probe, &mut claimed, config);

        // Highest (y, x) of the base minutia first.
        pairs.sort_by(|a, b| {
            let (pa, pb) = (base_side.points[a.0], base_side.points[b.0]);
            pb.1.total_cmp(&pa.1).then(pb.0.total_cmp(&pa.0)).then(a.cmp(b))
        });
        let mut tree: Vec<Pair> = grow_tree(&base_side, &probe_side, &pairs, config)
            .into_iter()
            .map(|i| pairs[i])
            .collect();
        let grown = tree.len();

        if tree.len() >= 2 {
            let in_tree_base: Vec<usize> = tree.iter().map(|t| t.0).collect();
            let in_tree_probe: Vec<usize> = tree.iter().map(|t| t.1).collect();
            let spurious_base: Vec<usize> = all_base.iter().copied().filter(|b| !in_tree_base.contains(b)).collect();
            let spurious_probe: Vec<usize> = all_probe.iter().copied().filter(|p| !in_tree_probe.contains(p)).collect();

            base_side.redescribe(&spurious_base, &in_tree_base, config.k_neighbors);
            probe_side.redescribe(&spurious_probe, &in_tree_probe, config.k_neighbors);

            let mut claimed = vec![false; nb];
            for &b in &in_tree_base {
                claimed[b] = true;
            }
            let rescued = pair_by_descriptors(&base_side, &probe_side, &spurious_base, &spurious_probe, &mut claimed, config);
            for pair in rescued {
                let needed = tree.len().min(2);
                let support = tree
                    .iter()
                    .filter(|&&t| edge_consistent(&base_side, &probe_side, t, pair, config))
                    .take(needed)
                    .count();
                if support >= needed {
                    trace!("Rescued pair {:?}", pair);
                    tree.push(pair);
                }
            }
        }

        let score = tree.len();
        let needed = (nb + np) as f32 / 4.0 - 1.0;
        let accepted = score >= 2 && score as f32 >= needed;
        debug!(
            "{}: {} pairs, tree of {}, {} after rescue, {:.1} needed",
            self.name(),
            pairs.len(),
            grown,
            score,
            needed
        );
        Evaluation { accepted, score }
    }
}
