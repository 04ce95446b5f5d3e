// tests/test_matcher.rs — Template matching: rigid motion, partial
// overlap, strangers, and argument-order independence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ridgeprint::config::Config;
use ridgeprint::descriptor::build_descriptors;
use ridgeprint::matcher::{match_templates, Decision, Reason, Strategy};
use ridgeprint::template::{CoreKind, CorePoint, FingerprintTemplate, Minutia, MinutiaKind};

/// `n` minutiae at least 22 px apart, within 110 px of the frame center
/// (128, 144) so that any rotation about it stays inside a 256×288 frame.
fn spread_minutiae(rng: &mut StdRng, n: usize) -> Vec<Minutia> {
    let mut out: Vec<Minutia> = Vec::with_capacity(n);
    while out.len() < n {
        let x: u16 = rng.gen_range(18..238);
        let y: u16 = rng.gen_range(34..254);
        if (x as f32 - 128.0).hypot(y as f32 - 144.0) > 110.0 {
            continue;
        }
        let crowded = out.iter().any(|m| {
            let (dx, dy) = (m.x as f32 - x as f32, m.y as f32 - y as f32);
            dx.hypot(dy) < 22.0
        });
        if crowded {
            continue;
        }
        let kind = if rng.gen_bool(0.5) { MinutiaKind::Ending } else { MinutiaKind::Bifurcation };
        out.push(Minutia::new(out.len() as u32, x, y, rng.gen_range(0.0..180.0), kind));
    }
    out
}

fn template(minutiae: Vec<Minutia>, cores: Vec<CorePoint>) -> FingerprintTemplate {
    build_descriptors(FingerprintTemplate::new(minutiae, cores), 5).unwrap()
}

/// Rotate by `degrees` about (128, 144), then translate, rounding to pixels.
fn rigid(minutiae: &[Minutia], degrees: f32, shift: (f32, f32)) -> Vec<Minutia> {
    let (s, c) = degrees.to_radians().sin_cos();
    minutiae
        .iter()
        .map(|m| {
            let (dx, dy) = (m.x as f32 - 128.0, m.y as f32 - 144.0);
            let x = 128.0 + c * dx - s * dy + shift.0;
            let y = 144.0 + s * dx + c * dy + shift.1;
            let angle = (m.angle + degrees).rem_euclid(180.0);
            Minutia::new(m.id, x.round() as u16, y.round() as u16, angle, m.kind)
        })
        .collect()
}

#[test]
fn rotated_and_translated_copy_matches() {
    let mut rng = StdRng::seed_from_u64(30);
    let original = spread_minutiae(&mut rng, 30);
    let t0 = template(original.clone(), vec![]);
    let t1 = template(rigid(&original, 30.0, (5.0, -3.0)), vec![]);

    let result = match_templates(&t0, &t1, Strategy::Auto, &Config::default()).unwrap();
    assert_eq!(result.decision, Decision::Match, "{result:?}");
    assert_eq!(result.reason, Reason::Structural);
    assert!(result.score >= 14);

    let reverse = match_templates(&t1, &t0, Strategy::Auto, &Config::default()).unwrap();
    assert_eq!(reverse, result);
}

#[test]
fn translated_copy_with_cores_matches_on_cores() {
    let mut rng = StdRng::seed_from_u64(31);
    let original = spread_minutiae(&mut rng, 24);
    let cores = vec![
        CorePoint::new(0, 120, 110, 30.0, CoreKind::Loop),
        CorePoint::new(1, 140, 200, 80.0, CoreKind::Delta),
    ];
    let shifted_cores: Vec<CorePoint> = cores
        .iter()
        .map(|c| CorePoint::new(c.id, c.x + 6, c.y - 4, c.angle, c.kind))
        .collect();
    let shifted = rigid(&original, 0.0, (6.0, -4.0));

    let t0 = template(original, cores);
    let t1 = template(shifted, shifted_cores);
    let config = Config::default();
    let result = match_templates(&t0, &t1, Strategy::Auto, &config).unwrap();
    assert_eq!(result.decision, Decision::Match);
    assert_eq!(result.reason, Reason::CoreAligned);
    assert_eq!(result.score, 24);

    let core_first = match_templates(&t0, &t1, Strategy::CoreFirst, &config).unwrap();
    assert_eq!(core_first.reason, Reason::CoreAligned);
}

#[test]
fn core_alignment_ignores_direction_noise() {
    let mut rng = StdRng::seed_from_u64(32);
    let original = spread_minutiae(&mut rng, 24);
    let cores = vec![
        CorePoint::new(0, 120, 110, 30.0, CoreKind::Loop),
        CorePoint::new(1, 140, 200, 80.0, CoreKind::Delta),
    ];
    let shifted_cores: Vec<CorePoint> = cores
        .iter()
        .map(|c| CorePoint::new(c.id, c.x + 3, c.y + 5, c.angle, c.kind))
        .collect();
    let noisy: Vec<Minutia> = rigid(&original, 0.0, (3.0, 5.0))
        .into_iter()
        .enumerate()
        .map(|(i, mut m)| {
            let jitter = if i % 2 == 0 { 4.0 } else { -4.0 };
            m.angle = (m.angle + jitter).rem_euclid(180.0);
            m
        })
        .collect();

    let t0 = template(original, cores);
    let t1 = template(noisy, shifted_cores);
    let result = match_templates(&t0, &t1, Strategy::CoreFirst, &Config::default()).unwrap();
    assert_eq!(result.decision, Decision::Match, "{result:?}");
    assert_eq!(result.reason, Reason::CoreAligned);
    assert_eq!(result.score, 24);
}

#[test]
fn every_template_matches_itself() {
    let mut rng = StdRng::seed_from_u64(6);
    let config = Config::default();
    for _ in 0..10 {
        let n = rng.gen_range(config.min_minutiae..40);
        let t = template(spread_minutiae(&mut rng, n), vec![]);
        for strategy in [Strategy::Auto, Strategy::Structural] {
            let result = match_templates(&t, &t, strategy, &config).unwrap();
            assert_eq!(result.decision, Decision::Match, "{n} minutiae, {strategy:?}");
        }
    }
}

#[test]
fn strangers_are_rejected() {
    let mut rng = StdRng::seed_from_u64(7);
    let config = Config::default();
    let trials = 60;
    let mut rejected = 0;
    for _ in 0..trials {
        let a = template(spread_minutiae(&mut rng, 30), vec![]);
        let b = template(spread_minutiae(&mut rng, 30), vec![]);
        let ab = match_templates(&a, &b, Strategy::Auto, &config).unwrap();
        let ba = match_templates(&b, &a, Strategy::Auto, &config).unwrap();
        assert_eq!(ab.decision, ba.decision);
        if ab.decision == Decision::NoMatch {
            rejected += 1;
        }
    }
    assert!(rejected * 100 >= trials * 95, "{rejected}/{trials} rejected");
}

#[test]
fn partial_print_with_noise_completes() {
    let mut rng = StdRng::seed_from_u64(40);
    let original = spread_minutiae(&mut rng, 30);
    let t0 = template(original.clone(), vec![]);

    // Drop 40% of the minutiae and add random noise minutiae.
    let mut kept: Vec<Minutia> = original.into_iter().filter(|m| m.id % 5 >= 2).collect();
    for _ in 0..8 {
        let kind = if rng.gen_bool(0.5) { MinutiaKind::Ending } else { MinutiaKind::Bifurcation };
        kept.push(Minutia::new(0, rng.gen_range(0..256), rng.gen_range(0..288), rng.gen_range(0.0..180.0), kind));
    }
    for (i, m) in kept.iter_mut().enumerate() {
        m.id = i as u32;
    }
    let t2 = template(kept, vec![]);

    let config = Config::default();
    for strategy in [Strategy::Auto, Strategy::Structural, Strategy::CoreFirst] {
        let forward = match_templates(&t0, &t2, strategy, &config).unwrap();
        let backward = match_templates(&t2, &t0, strategy, &config).unwrap();
        assert_eq!(forward, backward);
        assert!(forward.score <= 26);
    }
}

#[test]
fn templates_below_minimum_are_insufficient() {
    let mut rng = StdRng::seed_from_u64(8);
    let small = template(spread_minutiae(&mut rng, 12), vec![]);
    let big = template(spread_minutiae(&mut rng, 30), vec![]);

    let result = match_templates(&small, &big, Strategy::Auto, &Config::default()).unwrap();
    assert_eq!(result.reason, Reason::InsufficientData);
    assert!(!result.is_match());

    // The verify-only floor admits it.
    let result = match_templates(&small, &small, Strategy::Auto, &Config::verify_only()).unwrap();
    assert!(result.is_match());
}

#[test]
fn templates_without_neighborhoods_are_described_on_the_fly() {
    let mut rng = StdRng::seed_from_u64(9);
    let bare = FingerprintTemplate::new(spread_minutiae(&mut rng, 25), vec![]);
    assert!(!bare.has_descriptors());
    let described = build_descriptors(bare.clone(), 5).unwrap();
    let config = Config::default();
    let a = match_templates(&bare, &described, Strategy::Auto, &config).unwrap();
    assert!(a.is_match());
    assert_eq!(a.score, 25);
}
