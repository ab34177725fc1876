/// Unit tests for emitter_cdf.rs

use glam::Vec3;

use crate::lighting::{build_top_level_cdf, EmissionSource, EmitterCdf, NON_EMITTER_SENTINEL};

fn quad(scale: f32) -> (Vec<Vec3>, Vec<u16>) {
    let positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(scale, 0.0, 0.0),
        Vec3::new(scale, scale, 0.0),
        Vec3::new(0.0, scale, 0.0),
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    (positions, indices)
}

fn assert_normalized(cdf: &[f32]) {
    assert_eq!(cdf[0], 0.0);
    assert_eq!(*cdf.last().unwrap(), 1.0);
    for window in cdf.windows(2) {
        assert!(window[1] >= window[0]);
    }
}

#[test]
fn test_quad_cdf_is_uniform_over_equal_triangles() {
    let (positions, indices) = quad(1.0);
    let cdf = EmitterCdf::from_triangles(&positions, &indices, EmissionSource::Constant(Vec3::ONE));

    assert!(cdf.is_emitter());
    assert_normalized(cdf.cdf());
    assert_eq!(cdf.cdf().len(), 3);
    assert!((cdf.cdf()[1] - 0.5).abs() < 1e-5);
    // Total weight = area * |emission| = 1 * sqrt(3)
    assert!((cdf.total_weight() - 3.0f32.sqrt()).abs() < 1e-5);
}

#[test]
fn test_max_step_matches_max_normalized_weight() {
    // Triangles of areas 0.5 and 1.5: steps must be 0.25 and 0.75
    let positions = vec![
        Vec3::ZERO,
        Vec3::X,
        Vec3::Y,
        Vec3::new(2.0, 0.0, 1.0),
        Vec3::new(2.0, 1.5, 1.0),
        Vec3::new(0.0, 0.0, 1.0),
    ];
    let indices = vec![0, 1, 2, 3, 4, 5];
    let cdf = EmitterCdf::from_triangles(&positions, &indices, EmissionSource::Constant(Vec3::X));

    assert_normalized(cdf.cdf());
    let max_step = cdf
        .cdf()
        .windows(2)
        .map(|window| window[1] - window[0])
        .fold(0.0f32, f32::max);
    assert!((max_step - 0.75).abs() < 1e-5);
}

#[test]
fn test_texture_backed_emission_weighs_area_only() {
    let (positions, indices) = quad(2.0);
    let cdf = EmitterCdf::from_triangles(&positions, &indices, EmissionSource::Texture);
    // Area 4, magnitude 1
    assert!((cdf.total_weight() - 4.0).abs() < 1e-5);
}

#[test]
fn test_degenerate_triangles_produce_sentinel() {
    // All three vertices coincide; the total weight is zero
    let positions = vec![Vec3::ONE, Vec3::ONE, Vec3::ONE];
    let indices = vec![0, 1, 2];
    let cdf = EmitterCdf::from_triangles(&positions, &indices, EmissionSource::Constant(Vec3::ONE));

    assert!(!cdf.is_emitter());
    assert_eq!(cdf.cdf(), &[NON_EMITTER_SENTINEL]);
    assert_eq!(cdf.total_weight(), 0.0);
}

#[test]
fn test_top_level_cdf_over_mesh_weights() {
    let cdf = build_top_level_cdf(&[1.0, 3.0]);
    assert_normalized(&cdf);
    assert_eq!(cdf.len(), 3);
    assert!((cdf[1] - 0.25).abs() < 1e-5);
}

#[test]
fn test_top_level_cdf_with_zero_weights_is_uniform() {
    let cdf = build_top_level_cdf(&[0.0, 0.0, 0.0, 0.0]);
    assert_normalized(&cdf);
    for (i, &value) in cdf.iter().enumerate() {
        assert!((value - i as f32 * 0.25).abs() < 1e-5);
    }
}
