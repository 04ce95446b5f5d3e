// tests/test_enhance.rs — Ridge enhancement and feature extraction on a
// synthetic print.
//
// The print is a vertical ridge pattern of period 9 px with a grid of
// phase dislocations. Each dislocation starts one extra ridge, which shows
// up as a ridge ending or a bifurcation.

use std::f32::consts::PI;

use ridgeprint::config::{Config, EnhanceConfig};
use ridgeprint::decode::Sample;
use ridgeprint::enhance::enhance;
use ridgeprint::extract::extract_from;
use ridgeprint::image::Image;
use ridgeprint::minutiae::crossing_number;

const SIZE: usize = 224;

fn synthetic_print() -> Sample {
    let mut dislocations = Vec::new();
    for j in 0..5 {
        for i in 0..5 {
            let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
            dislocations.push((40.0 + 36.0 * i as f32, 40.0 + 36.0 * j as f32, sign));
        }
    }
    Sample::from_image(Image::from_fn(SIZE, SIZE, |x, y| {
        let (x, y) = (x as f32, y as f32);
        let winding: f32 = dislocations
            .iter()
            .map(|&(cx, cy, s)| s * (y - cy).atan2(x - cx))
            .sum();
        (128.0 - 90.0 * (2.0 * PI * x / 9.0 + winding).cos()).round() as u8
    }))
}

#[test]
fn skeleton_stays_inside_roi() {
    let enhanced = enhance(&synthetic_print(), &EnhanceConfig::default()).unwrap();
    assert!(enhanced.roi.count_set() > SIZE * SIZE / 2);
    for (x, y, set) in enhanced.skeleton.pixels() {
        if set {
            assert!(enhanced.roi.get(x, y), "skeleton pixel ({x}, {y}) outside ROI");
        }
    }
}

#[test]
fn skeleton_has_one_line_per_ridge() {
    let enhanced = enhance(&synthetic_print(), &EnhanceConfig::default()).unwrap();
    // Vertical ridges 9 px apart leave about one skeleton pixel per ridge
    // per row.
    let expected = enhanced.roi.count_set() as f32 / 9.0;
    let found = enhanced.skeleton.count_set() as f32;
    assert!(found > 0.5 * expected && found < 1.5 * expected, "{found} vs {expected}");
}

#[test]
fn skeleton_pixels_have_valid_crossing_numbers() {
    let enhanced = enhance(&synthetic_print(), &EnhanceConfig::default()).unwrap();
    let sk = &enhanced.skeleton;
    for y in 1..sk.height() - 1 {
        for x in 1..sk.width() - 1 {
            if sk.get(x, y) {
                assert!(crossing_number(sk, x, y) <= 4);
            }
        }
    }
}

#[test]
fn extraction_finds_dislocations() {
    let config = Config::verify_only();
    let enhanced = enhance(&synthetic_print(), &config.enhance).unwrap();
    let template = extract_from(&enhanced, &config).unwrap();
    assert!(template.minutiae().len() >= config.min_minutiae);
    template.validate_in_roi(&enhanced.roi).unwrap();

    // Every minutia angle is a ridge orientation in [0°, 180°).
    for m in template.minutiae() {
        assert!((0.0..180.0).contains(&m.angle), "{m:?}");
    }
    // Ids follow raster order.
    for pair in template.minutiae().windows(2) {
        assert_eq!(pair[1].id, pair[0].id + 1);
        assert!((pair[0].y, pair[0].x) < (pair[1].y, pair[1].x));
    }
}

#[test]
fn flat_sample_is_void() {
    let sample = Sample::from_image(Image::filled(96, 96, 200u8));
    let err = enhance(&sample, &EnhanceConfig::default()).unwrap_err();
    assert_eq!(err, ridgeprint::FingerprintError::VoidImage);
}
