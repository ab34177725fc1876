/// Unit tests for material.rs
///
/// The dual texture-or-constant encoding is the single source of truth
/// for materials and emissions; these tests pin the bit layout.

use glam::Vec3;

use crate::scene::{
    decode_r, decode_rgb, encode_r, encode_rgb, is_texture, StandardEmission, StandardMaterial,
    MATERIAL_CONSTANT_FLAG,
};

#[test]
fn test_rgb_round_trip_is_exact_at_8_bits() {
    // decode(encode(v)) == round(v * 255) / 255 exactly
    for r in 0..=255u32 {
        let v = Vec3::new(r as f32 / 255.0, 0.25, 1.0);
        let encoded = encode_rgb(v);
        assert_ne!(encoded & MATERIAL_CONSTANT_FLAG, 0);
        let decoded = decode_rgb(encoded);
        let expected = (v * 255.0).round() / 255.0;
        assert_eq!(decoded, expected);
    }
}

#[test]
fn test_rgb_encode_saturates() {
    assert_eq!(
        decode_rgb(encode_rgb(Vec3::new(2.0, -1.0, 0.5))),
        Vec3::new(1.0, 0.0, 128.0 / 255.0)
    );
}

#[test]
fn test_scalar_round_trip_is_exact_at_16_bits() {
    for value in [0.0f32, 0.1, 0.5, 0.9, 1.0] {
        let encoded = encode_r(value);
        assert_ne!(encoded & MATERIAL_CONSTANT_FLAG, 0);
        let decoded = decode_r(encoded);
        let expected = (value.clamp(0.0, 1.0) * 65535.0).round() / 65535.0;
        assert_eq!(decoded, expected);
    }
}

#[test]
fn test_texture_indices_keep_flag_clear() {
    for texture_index in [0u32, 1, 42, 999] {
        assert!(is_texture(texture_index));
        // A texture-index field decodes back to the original id
        assert_eq!(texture_index & !MATERIAL_CONSTANT_FLAG, texture_index);
    }
    assert!(!is_texture(encode_rgb(Vec3::ONE)));
    assert!(!is_texture(encode_r(0.5)));
}

#[test]
fn test_black_material_has_constant_channels() {
    let material = StandardMaterial::black();
    assert!(!material.has_diffuse_texture());
    assert!(!material.has_specular_texture());
    assert!(!material.has_roughness_texture());
    assert_eq!(decode_rgb(material.diffuse_field), Vec3::ZERO);
    assert_eq!(decode_r(material.roughness_field), 1.0);
}

#[test]
fn test_emission_non_zero_detection() {
    let black = StandardEmission::black();
    assert!(!black.is_emission_texture());
    assert!(!black.is_non_zero());

    let glowing = StandardEmission {
        emission_field: encode_rgb(Vec3::new(0.5, 0.5, 0.5)),
    };
    assert!(glowing.is_non_zero());

    // A texture-backed emission is assumed non-zero
    let textured = StandardEmission { emission_field: 7 };
    assert!(textured.is_emission_texture());
    assert!(textured.is_non_zero());
}

#[test]
fn test_gpu_layouts() {
    assert_eq!(std::mem::size_of::<StandardMaterial>(), 16);
    assert_eq!(std::mem::size_of::<StandardEmission>(), 4);
}
