//! Engine-wide capacity limits and buffer-index type aliases.
//!
//! The mega-buffers are allocated once at these capacities; exceeding any
//! of them during scene build is fatal. Indices in the mega index buffer
//! are [`VertexIndex`]-wide and relative to each geometry's vertex base,
//! which is why geometries are split so their vertex count fits the index
//! type, and why every geometry base is aligned to
//! [`GEOMETRY_BASE_ALIGNMENT`] elements.

/// Index type of the mega index buffer. Indices are relative to the
/// owning geometry's vertex base, so a geometry may reference at most
/// `VertexIndex::MAX` vertices.
pub type VertexIndex = u16;

/// Integer type for counts and offsets mirrored into GPU tables.
pub type BufferSize = u32;

/// Maximum number of vertices in the shared position/packed-vertex buffers.
pub const MAX_NUM_VERTICES: usize = 4_000_000;

/// Maximum number of indices in the shared index buffer.
pub const MAX_NUM_INDICES: usize = 4_000_000;

/// Maximum number of standard materials.
pub const MAX_NUM_STANDARD_MATERIALS: usize = 1000;

/// Maximum number of standard emissions.
pub const MAX_NUM_STANDARD_EMISSIONS: usize = 1000;

/// Maximum number of bindless texture slots.
pub const MAX_NUM_BINDLESS_TEXTURES: usize = 1000;

/// Maximum number of geometry table entries.
pub const MAX_NUM_GEOMETRY_TABLE_ENTRIES: usize = 10_000;

/// Maximum number of base-instance table entries.
pub const MAX_NUM_BASE_INSTANCE_TABLE_ENTRIES: usize = 1000;

/// Every geometry's vertex and index base is rounded up to a multiple of
/// this element count, so relative 16-bit indexing never straddles an
/// unaligned geometry boundary.
pub const GEOMETRY_BASE_ALIGNMENT: usize = 32;

/// Round `value` up to the next multiple of `alignment`.
pub const fn round_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}
