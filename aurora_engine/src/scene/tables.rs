//! Bindless indirection tables (GPU layout)
//!
//! In bindless rendering a hit shader only receives `InstanceID`,
//! `GeometryIndex`, and `PrimitiveIndex`. The geometry row is recovered
//! as:
//!
//! ```text
//! geometry_table[base_instance_table[InstanceID].geometry_table_index_base + GeometryIndex]
//! ```
//!
//! Entry 0 of the base-instance table is always `{0}`, so a shader that
//! sees `InstanceID == 0` can skip the first fetch.

use bytemuck::{Pod, Zeroable};

/// One geometry row of the bindless geometry table
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct GeometryTableEntry {
    /// First vertex of the geometry in the mega vertex buffers
    pub vertex_base_index: u32,
    /// First index of the geometry in the mega index buffer
    pub index_base_index: u32,
    /// Row in the material buffer
    pub material_index: u32,
    /// Row in the emission buffer (0 = black fallback)
    pub emission_index: u32,
}

/// One row of the base-instance table
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct BaseInstanceTableEntry {
    /// First geometry-table row of this base instance
    pub geometry_table_index_base: u16,
}
