/// Acceleration-structure build descriptors and handles
///
/// One BLAS is built per base instance over all geometries sharing the
/// mega-buffers; one TLAS references every world-space scene instance.

use crate::graphics_device::{Buffer, BufferFormat, IndexType};

/// Build hint for acceleration structures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelBuildHint {
    /// Static geometry, optimize for trace speed
    FastTrace,
    /// Geometry may be refit/rebuilt, optimize for build speed
    Deformable,
}

/// One triangle geometry inside a BLAS build, referencing the shared
/// vertex and index mega-buffers at byte offsets.
pub struct BlasGeometryDesc<'a> {
    pub vertex_buffer: &'a dyn Buffer,
    /// Byte offset of the geometry's first vertex
    pub vertex_offset: u64,
    pub vertex_format: BufferFormat,
    /// Byte stride between vertices
    pub vertex_stride: u64,
    pub vertex_count: u32,

    pub index_buffer: &'a dyn Buffer,
    /// Byte offset of the geometry's first index
    pub index_offset: u64,
    pub index_type: IndexType,
    pub index_count: u32,

    /// Whether any-hit shaders are skipped for this geometry
    pub is_opaque: bool,
}

/// Bottom-level acceleration structure
pub trait Blas: Send + Sync {
    /// Number of geometries the BLAS was built over
    fn geometry_count(&self) -> usize;
}

/// One instance inside a TLAS build
pub struct TlasInstanceDesc<'a> {
    pub blas: &'a dyn Blas,
    /// Row-major 3x4 world transform
    pub transform: [f32; 12],
    /// Hit-group offset applied at intersection
    pub hit_group_offset: u32,
    /// 8-bit visibility mask
    pub mask: u8,
    /// Value returned by `InstanceID()` in shaders
    pub instance_id: u32,
}

/// Top-level acceleration structure
pub trait Tlas: Send + Sync {
    /// Number of instances the TLAS was built over
    fn instance_count(&self) -> usize;
}

/// Convert a column-major 4x4 affine transform into the row-major 3x4
/// layout acceleration-structure builds consume.
pub fn transform_to_rows_3x4(transform: &glam::Mat4) -> [f32; 12] {
    let rows = transform.transpose();
    let mut out = [0.0f32; 12];
    out[0..4].copy_from_slice(&rows.x_axis.to_array());
    out[4..8].copy_from_slice(&rows.y_axis.to_array());
    out[8..12].copy_from_slice(&rows.z_axis.to_array());
    out
}
