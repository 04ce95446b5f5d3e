// core_aligned.rs — Matching anchored on singular points.
//
// Every pair of same-kind cores (one per template) proposes an integer
// translation probe → base. A translation is kept when at least
// `minimum_cores` translated probe cores land on a same-kind base core.
// The kept translation then votes minutiae: a translated probe minutia
// matches the first unclaimed base minutia of the same kind within the
// distance tolerance, which grows with the distance from the anchoring
// core. Minutia directions are not compared. Each base minutia is claimed
// once.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::{distance, Evaluation, Matcher};
use crate::config::Config;
use crate::template::FingerprintTemplate;

pub struct CoreAligned;

/// Translation probe → base, anchored at a base core.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Hypothesis {
    dx: i32,
    dy: i32,
    anchor: (f32, f32),
}

impl Hypothesis {
    #[inline]
    fn apply(&self, x: u16, y: u16) -> (f32, f32) {
        ((x as i32 + self.dx) as f32, (y as i32 + self.dy) as f32)
    }
}

fn hypotheses(base: &FingerprintTemplate, probe: &FingerprintTemplate) -> Vec<Hypothesis> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for b in base.cores() {
        for p in probe.cores().iter().filter(|p| p.kind == b.kind) {
            let (dx, dy) = (b.x as i32 - p.x as i32, b.y as i32 - p.y as i32);
            if seen.insert((dx, dy)) {
                out.push(Hypothesis {
                    dx,
                    dy,
                    anchor: (b.x as f32, b.y as f32),
                });
            }
        }
    }
    out
}

/// Probe cores that land on a base core of the same kind.
fn core_votes(base: &FingerprintTemplate, probe: &FingerprintTemplate, h: &Hypothesis, tolerance: f32) -> usize {
    probe
        .cores()
        .iter()
        .filter(|p| {
            let t = h.apply(p.x, p.y);
            base.cores()
                .iter()
                .any(|b| b.kind == p.kind && distance(t, (b.x as f32, b.y as f32)) <= tolerance)
        })
        .count()
}

/// Minutiae matched under translation `h`.
fn minutia_votes(base: &FingerprintTemplate, probe: &FingerprintTemplate, h: &Hypothesis, config: &Config) -> usize {
    let mut claimed = vec![false; base.minutiae().len()];
    let mut votes = 0;
    for p in probe.minutiae() {
        let t = h.apply(p.x, p.y);
        let tolerance = config.distance_tolerance(distance(h.anchor, t));
        let hit = base.minutiae().iter().enumerate().position(|(i, b)| {
            !claimed[i] && b.kind == p.kind && distance(t, b.position()) <= tolerance
        });
        if let Some(i) = hit {
            claimed[i] = true;
            votes += 1;
        }
    }
    votes
}

impl Matcher for CoreAligned {
    fn name(&self) -> &'static str {
        "core-aligned"
    }

    fn evaluate(&self, base: &FingerprintTemplate, probe: &FingerprintTemplate, config: &Config) -> Evaluation {
        if base.cores().len() < config.minimum_cores || probe.cores().len() < config.minimum_cores {
            return Evaluation::REJECTED;
        }

        let mut best = 0;
        for h in hypotheses(base, probe) {
            let cores = core_votes(base, probe, &h, config.core_distance_tolerance);
            if cores < config.minimum_cores {
                continue;
            }
            let votes = minutia_votes(base, probe, &h, config);
            trace!("Translation ({}, {}): {} cores, {} minutiae", h.dx, h.dy, cores, votes);
            best = best.max(votes);
        }

        let needed = base.minutiae().len().max(probe.minutiae().len()) as f32 / 2.0;
        let accepted = best > 0 && best as f32 >= needed;
        debug!("{}: {} votes, {:.1} needed", self.name(), best, needed);
        Evaluation { accepted, score: best }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{CoreKind, CorePoint, Minutia, MinutiaKind};

    fn template(shift: (u16, u16), cores: &[(u16, u16, CoreKind)]) -> FingerprintTemplate {
        let minutiae = (0..24u16)
            .map(|i| {
                let kind = if i % 2 == 0 { MinutiaKind::Ending } else { MinutiaKind::Bifurcation };
                Minutia::new(
                    i as u32,
                    30 + shift.0 + 17 * (i % 6),
                    30 + shift.1 + 19 * (i / 6),
                    (i * 23 % 180) as f32,
                    kind,
                )
            })
            .collect();
        let cores = cores
            .iter()
            .enumerate()
            .map(|(i, &(x, y, k))| CorePoint::new(i as u32, x + shift.0, y + shift.1, 0.0, k))
            .collect();
        FingerprintTemplate::new(minutiae, cores)
    }

    const CORES: [(u16, u16, CoreKind); 2] = [(60, 60, CoreKind::Loop), (90, 100, CoreKind::Delta)];

    #[test]
    fn test_translated_copy_matches() {
        let base = template((0, 0), &CORES);
        let probe = template((7, 4), &CORES);
        let e = CoreAligned.evaluate(&base, &probe, &Config::default());
        assert!(e.accepted);
        assert_eq!(e.score, 24);
    }

    #[test]
    fn test_one_core_is_not_enough() {
        let base = template((0, 0), &CORES[..1]);
        let probe = template((0, 0), &CORES[..1]);
        assert_eq!(CoreAligned.evaluate(&base, &probe, &Config::default()), Evaluation::REJECTED);
    }

    #[test]
    fn test_core_kinds_must_agree() {
        let base = template((0, 0), &CORES);
        let swapped = [(60, 60, CoreKind::Delta), (90, 100, CoreKind::Loop)];
        let probe = template((0, 0), &swapped);
        let e = CoreAligned.evaluate(&base, &probe, &Config::default());
        assert!(!e.accepted);
        assert_eq!(e.score, 0);
    }

    #[test]
    fn test_direction_noise_still_votes() {
        let base = template((0, 0), &CORES);
        let (minutiae, cores) = template((5, 2), &CORES).into_parts();
        let noisy = minutiae
            .into_iter()
            .map(|mut m| {
                m.angle = (m.angle + 3.0) % 180.0;
                m
            })
            .collect();
        let probe = FingerprintTemplate::new(noisy, cores);
        let e = CoreAligned.evaluate(&base, &probe, &Config::default());
        assert!(e.accepted);
        assert_eq!(e.score, 24);
    }

    #[test]
    fn test_kinds_must_agree_to_vote() {
        let base = template((0, 0), &CORES);
        let (minutiae, cores) = template((0, 0), &CORES).into_parts();
        let flipped = minutiae
            .into_iter()
            .map(|mut m| {
                m.kind = match m.kind {
                    MinutiaKind::Ending => MinutiaKind::Bifurcation,
                    MinutiaKind::Bifurcation => MinutiaKind::Ending,
                };
                m
            })
            .collect();
        let probe = FingerprintTemplate::new(flipped, cores);
        let e = CoreAligned.evaluate(&base, &probe, &Config::default());
        assert!(!e.accepted);
    }

    #[test]
    fn test_hypotheses_are_deduplicated() {
        let cores = [(60, 60, CoreKind::Loop), (60, 60, CoreKind::Loop)];
        let base = template((0, 0), &cores);
        let probe = template((3, 0), &cores);
        let hs = hypotheses(&base, &probe);
        assert_eq!(hs.len(), 1);
        assert_eq!((hs[0].dx, hs[0].dy), (-3, 0));
    }
}
