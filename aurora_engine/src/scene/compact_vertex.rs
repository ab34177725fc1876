//! Packed per-vertex shading attributes (GPU layout)
//!
//! Parallel to the position stream: one record per vertex carrying the
//! shading normal and one texture coordinate pair. 20 bytes.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CompactVertex {
    pub snormal: [f32; 3],
    pub texcoord: [f32; 2],
}

impl CompactVertex {
    /// Store a shading normal; must be unit length.
    pub fn set_snormal(&mut self, snormal: Vec3) {
        debug_assert!(
            (1.0 - snormal.length()).abs() <= 0.001,
            "shading normal is not unit length: {:?}",
            snormal
        );
        self.snormal = snormal.to_array();
    }

    pub fn snormal(&self) -> Vec3 {
        Vec3::from_array(self.snormal)
    }

    pub fn set_texcoord(&mut self, texcoord: Vec2) {
        self.texcoord = texcoord.to_array();
    }

    pub fn texcoord(&self) -> Vec2 {
        Vec2::from_array(self.texcoord)
    }
}
