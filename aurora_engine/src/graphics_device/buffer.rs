/// Buffer trait, buffer descriptor, and buffer element formats

use bitflags::bitflags;
use crate::error::Result;

bitflags! {
    /// Buffer usage flags (combinable)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        /// Vertex buffer
        const VERTEX = 1 << 0;
        /// Index buffer
        const INDEX = 1 << 1;
        /// Uniform/constant buffer
        const CONSTANT = 1 << 2;
        /// Storage buffer
        const STORAGE = 1 << 3;
        /// Source of a transfer (staging upload)
        const TRANSFER_SRC = 1 << 4;
        /// Destination of a transfer
        const TRANSFER_DST = 1 << 5;
        /// Input to an acceleration-structure build
        const ACCEL_STRUCT_INPUT = 1 << 6;
    }
}

/// Where the buffer's memory lives and who can touch it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryResidency {
    /// Device-local, not CPU-visible; written only through transfers
    GpuOnly,
    /// CPU-writable, GPU-readable (per-frame constant data)
    CpuToGpu,
    /// CPU-only staging memory
    CpuOnly,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Memory residency
    pub residency: MemoryResidency,
}

/// Index width of an index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Returns size in bytes of one index
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Buffer element format for vertex attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_SFLOAT,          // float (4 bytes)
    R32G32_SFLOAT,       // vec2 (8 bytes)
    R32G32B32_SFLOAT,    // vec3 (12 bytes)
    R32G32B32A32_SFLOAT, // vec4 (16 bytes)
    R16_UINT,
    R32_UINT,
}

impl BufferFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT | BufferFormat::R32_UINT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT => 16,
            BufferFormat::R16_UINT => 2,
        }
    }
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types.
/// The buffer is destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Write `data` at `offset` through the CPU mapping.
    ///
    /// Fails on `MemoryResidency::GpuOnly` buffers; those are written
    /// through staging copies on a transfer queue.
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Size in bytes
    fn size(&self) -> u64;
}
