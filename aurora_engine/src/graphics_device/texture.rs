/// Texture trait and texture descriptor
///
/// There is a single texture record for every image the engine touches;
/// variants (G-buffer target, sampled material texture, swapchain view)
/// are discriminated by the format and usage fields, not by type.

use bitflags::bitflags;

/// Texture pixel formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_UNORM_SRGB,
    B8G8R8A8_UNORM,
    R11G11B10_UFLOAT,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,
}

impl TextureFormat {
    /// Returns size in bytes of one pixel
    pub fn size_bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8_UNORM => 1,
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::R8G8B8A8_UNORM_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::R11G11B10_UFLOAT
            | TextureFormat::R32_SFLOAT => 4,
            TextureFormat::R16G16B16A16_SFLOAT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

bitflags! {
    /// Texture usage flags (combinable)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureUsage: u32 {
        /// Sampled in a shader
        const SAMPLED = 1 << 0;
        /// Read/written as a storage (UAV) image
        const STORAGE = 1 << 1;
        /// Rendered to as a color attachment
        const COLOR_ATTACHMENT = 1 << 2;
        /// Source of a transfer
        const TRANSFER_SRC = 1 << 3;
        /// Destination of a transfer
        const TRANSFER_DST = 1 << 4;
    }
}

/// Tracked image state for layout transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    Undefined,
    TransferDst,
    ShaderReadOnly,
    UnorderedAccess,
    ColorAttachment,
    Present,
}

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
    /// State the texture starts its life in
    pub initial_state: TextureState,
}

/// Queryable texture information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

/// Texture resource trait
///
/// Implemented by backend-specific texture types.
/// The texture is destroyed when dropped.
pub trait Texture: Send + Sync {
    /// Get texture information
    fn info(&self) -> &TextureInfo;
}
