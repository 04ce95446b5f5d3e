// matcher — Decide whether two templates come from the same finger.
//
// Two strategies sit behind the `Matcher` trait:
//
//   CoreAligned  translate the probe so its singular points land on the
//                base's, then count minutiae that line up
//   Structural   pair minutiae by their local descriptors, keep the pairs
//                whose mutual geometry agrees, and count those
//
// `match_templates` picks strategies per `Strategy`. It evaluates the two
// templates in a canonical operand order, so match(a, b) and match(b, a)
// always agree. Matchers hold no state; every tolerance comes in through
// the `Config`.

pub mod core_aligned;
pub mod structural;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use core_aligned::CoreAligned;
pub use structural::Structural;

use crate::config::Config;
use crate::descriptor::ensure_descriptors;
use crate::error::Result;
use crate::template::{CorePoint, FingerprintTemplate, Minutia, TupleDescriptor};

/// Which matching strategies to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Core-aligned matching only.
    CoreFirst,
    /// Structural matching only.
    Structural,
    /// Core-aligned first, structural when that does not accept.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Match,
    NoMatch,
}

/// Why a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reason {
    /// Accepted by core-aligned matching.
    CoreAligned,
    /// Accepted by structural matching.
    Structural,
    /// Every strategy that ran scored below its threshold.
    BelowThreshold,
    /// A template had fewer minutiae than the configured minimum.
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub decision: Decision,
    pub reason: Reason,
    /// Votes of the last strategy that ran (matched minutiae).
    pub score: usize,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.decision == Decision::Match
    }
}

/// Outcome of a single strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub accepted: bool,
    pub score: usize,
}

impl Evaluation {
    pub const REJECTED: Evaluation = Evaluation {
        accepted: false,
        score: 0,
    };
}

/// One matching strategy. Implementations are pure functions of their
/// inputs; both templates carry neighborhoods when `evaluate` is called.
pub trait Matcher {
    fn name(&self) -> &'static str;

    fn evaluate(&self, base: &FingerprintTemplate, probe: &FingerprintTemplate, config: &Config) -> Evaluation;
}

/// Absolute difference of two axial angles in degrees, in [0, 90].
#[inline]
pub(crate) fn axial_difference(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(180.0);
    d.min(180.0 - d)
}

#[inline]
pub(crate) fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn minutia_key(m: &Minutia) -> (u16, u16, u8, u32) {
    (m.x, m.y, m.kind.code(), m.angle.to_bits())
}

fn descriptor_key(d: &TupleDescriptor) -> (u32, u32, u8, u8) {
    (
        d.ratio.to_bits(),
        d.interior_angle.to_bits(),
        d.neighbor_a_kind.code(),
        d.neighbor_b_kind.code(),
    )
}

fn core_key(c: &CorePoint) -> (u16, u16, u8, u32) {
    (c.x, c.y, c.kind.code(), c.angle.to_bits())
}

/// Total order over templates by minutia count, core count, then point
/// data. Equal only when the matcher cannot tell the two apart.
pub fn canonical_cmp(a: &FingerprintTemplate, b: &FingerprintTemplate) -> Ordering {
    a.minutiae()
        .len()
        .cmp(&b.minutiae().len())
        .then(a.cores().len().cmp(&b.cores().len()))
        .then_with(|| {
            for (ma, mb) in a.minutiae().iter().zip(b.minutiae()) {
                let ord = minutia_key(ma)
                    .cmp(&minutia_key(mb))
                    .then(ma.neighborhood.len().cmp(&mb.neighborhood.len()))
                    .then_with(|| {
                        ma.neighborhood
                            .iter()
                            .map(descriptor_key)
                            .cmp(mb.neighborhood.iter().map(descriptor_key))
                    });
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        })
        .then_with(|| a.cores().iter().map(core_key).cmp(b.cores().iter().map(core_key)))
}

fn decided(evaluation: Evaluation, accepted_reason: Reason) -> MatchResult {
    if evaluation.accepted {
        MatchResult {
            decision: Decision::Match,
            reason: accepted_reason,
            score: evaluation.score,
        }
    } else {
        MatchResult {
            decision: Decision::NoMatch,
            reason: Reason::BelowThreshold,
            score: evaluation.score,
        }
    }
}

/// Match `probe` against `base`.
///
/// A negative answer is a `NoMatch` result, never an error. Templates
/// without neighborhoods are described on a copy first; only that step can
/// fail.
pub fn match_templates(
    base: &FingerprintTemplate,
    probe: &FingerprintTemplate,
    strategy: Strategy,
    config: &Config,
) -> Result<MatchResult> {
    let (nb, np) = (base.minutiae().len(), probe.minutiae().len());
    if nb < config.min_minutiae || np < config.min_minutiae {
        debug!(
            "Insufficient data: {} and {} minutiae, {} required",
            nb, np, config.min_minutiae
        );
        return Ok(MatchResult {
            decision: Decision::NoMatch,
            reason: Reason::InsufficientData,
            score: 0,
        });
    }

    let base = ensure_descriptors(base, config.k_neighbors)?;
    let probe = ensure_descriptors(probe, config.k_neighbors)?;
    let (first, second) = match canonical_cmp(&base, &probe) {
        Ordering::Greater => (probe.as_ref(), base.as_ref()),
        _ => (base.as_ref(), probe.as_ref()),
    };

    let result = match strategy {
        Strategy::CoreFirst => decided(CoreAligned.evaluate(first, second, config), Reason::CoreAligned),
        Strategy::Structural => decided(Structural.evaluate(first, second, config), Reason::Structural),
        Strategy::Auto => {
            let cores = CoreAligned.evaluate(first, second, config);
            if cores.accepted {
                decided(cores, Reason::CoreAligned)
            } else {
                decided(Structural.evaluate(first, second, config), Reason::Structural)
            }
        }
    };
    debug!(
        "Match {:?} via {:?}: {:?} (score {})",
        strategy, result.reason, result.decision, result.score
    );
    Ok(result)
}
