//! Standard material and emission records (GPU layout)
//!
//! Every channel field is a single `u32` carrying *either* a bindless
//! texture index *or* a packed constant. Bit 24 is the discriminator: a
//! field with bit 24 clear is a texture index, a field with bit 24 set is
//! a constant — 8-bit-per-channel RGB in the low 24 bits, or a 16-bit
//! gray value in the low 16 bits. The encoding is the single source of
//! truth; shaders use the identical bit test.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Discriminator bit: set for packed constants, clear for texture indices
pub const MATERIAL_CONSTANT_FLAG: u32 = 1 << 24;

/// Pack a `[0, 1]` RGB color into the low 24 bits with the constant flag
pub fn encode_rgb(v: Vec3) -> u32 {
    let c = (v.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    let r = c.x as u32;
    let g = c.y as u32;
    let b = c.z as u32;
    r | (g << 8) | (b << 16) | MATERIAL_CONSTANT_FLAG
}

/// Decode a packed RGB constant (low 24 bits, 8 bits per channel)
pub fn decode_rgb(v: u32) -> Vec3 {
    const RCP_255: f32 = 1.0 / 255.0;
    let r = (v & 0xff) as f32;
    let g = ((v >> 8) & 0xff) as f32;
    let b = ((v >> 16) & 0xff) as f32;
    Vec3::new(r, g, b) * RCP_255
}

/// Pack a `[0, 1]` scalar into the low 16 bits with the constant flag
pub fn encode_r(v: f32) -> u32 {
    let u = (v.clamp(0.0, 1.0) * 65535.0).round() as u32;
    u | MATERIAL_CONSTANT_FLAG
}

/// Decode a packed scalar constant (low 16 bits)
pub fn decode_r(v: u32) -> f32 {
    const RCP_65535: f32 = 1.0 / 65535.0;
    (v & 0xffff) as f32 * RCP_65535
}

/// Whether a channel field refers to a texture (flag bit clear)
pub fn is_texture(field: u32) -> bool {
    field & MATERIAL_CONSTANT_FLAG == 0
}

/// Standard material record, mirrored to the GPU material buffer.
///
/// 16 bytes. Row 0 of the material buffer is the reserved black material.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct StandardMaterial {
    pub diffuse_field: u32,
    pub specular_field: u32,
    pub roughness_field: u32,
    pub padding: u32,
}

impl StandardMaterial {
    /// The reserved black material: black diffuse/specular constants and
    /// full roughness.
    pub fn black() -> Self {
        Self {
            diffuse_field: encode_rgb(Vec3::ZERO),
            specular_field: encode_rgb(Vec3::ZERO),
            roughness_field: encode_r(1.0),
            padding: 0,
        }
    }

    pub fn has_diffuse_texture(&self) -> bool {
        is_texture(self.diffuse_field)
    }

    pub fn has_specular_texture(&self) -> bool {
        is_texture(self.specular_field)
    }

    pub fn has_roughness_texture(&self) -> bool {
        is_texture(self.roughness_field)
    }
}

/// Standard emission record, mirrored to the GPU emission buffer.
///
/// A single field with the same dual encoding. Row 0 of the emission
/// buffer is the reserved black emission; a geometry whose emission index
/// is 0 never appears in the emitter CDF.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct StandardEmission {
    pub emission_field: u32,
}

impl StandardEmission {
    /// The reserved black emission
    pub fn black() -> Self {
        Self {
            emission_field: encode_rgb(Vec3::ZERO),
        }
    }

    pub fn is_emission_texture(&self) -> bool {
        is_texture(self.emission_field)
    }

    /// Decoded constant emission; meaningless for texture-backed fields
    pub fn decoded_emission(&self) -> Vec3 {
        decode_rgb(self.emission_field)
    }

    /// Whether this emission contributes light: texture-backed emissions
    /// are assumed non-zero, constants are checked after decoding.
    pub fn is_non_zero(&self) -> bool {
        if self.is_emission_texture() {
            true
        } else {
            self.decoded_emission().length() > 0.0
        }
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
