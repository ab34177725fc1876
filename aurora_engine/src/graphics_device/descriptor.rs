/// Descriptor sets and register records
///
/// Pass code never touches raw set/binding integers inline; each pass owns
/// a `...Registers` struct of [`Register`] records mirroring its shader's
/// register layout, and writes slots through them.

use crate::error::Result;
use crate::graphics_device::{Buffer, Texture, Tlas};

/// Texture sampler
pub trait Sampler: Send + Sync {}

/// Descriptor set allocated from a per-flight pool for one shader space
///
/// Slots are staged host-side by the `set_*` calls and flushed to the
/// device by `update()` before the set is bound.
pub trait DescriptorSet: Send + Sync {
    /// Set a constant (uniform) buffer slot
    fn set_constant_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()>;

    /// Set a structured (storage) buffer slot
    fn set_structured_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()>;

    /// Set one element of a structured-buffer array slot
    fn set_structured_buffer_element(
        &mut self,
        binding: u32,
        array_index: u32,
        buffer: &dyn Buffer,
    ) -> Result<()>;

    /// Set a read-write (storage) texture slot
    fn set_rw_texture(&mut self, binding: u32, texture: &dyn Texture) -> Result<()>;

    /// Set one element of a sampled-texture array slot (bindless table)
    fn set_texture(&mut self, binding: u32, array_index: u32, texture: &dyn Texture)
        -> Result<()>;

    /// Set a sampler slot
    fn set_sampler(&mut self, binding: u32, sampler: &dyn Sampler) -> Result<()>;

    /// Set an acceleration-structure slot
    fn set_acceleration_structure(&mut self, binding: u32, tlas: &dyn Tlas) -> Result<()>;

    /// Flush staged slots to the device
    fn update(&mut self) -> Result<()>;
}

/// A shader register: descriptor space, binding, and array size.
///
/// Plain data; the pass owns one per slot its shaders declare and routes
/// every descriptor write through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub space: u32,
    pub binding: u32,
    pub count: u32,
}

impl Register {
    /// A single-descriptor register
    pub const fn new(space: u32, binding: u32) -> Self {
        Self { space, binding, count: 1 }
    }

    /// An array register with `count` descriptors
    pub const fn array(space: u32, binding: u32, count: u32) -> Self {
        Self { space, binding, count }
    }

    /// Set a constant buffer through this register
    pub fn set_constant_buffer(
        &self,
        sets: &mut [Box<dyn DescriptorSet>],
        buffer: &dyn Buffer,
    ) -> Result<()> {
        sets[self.space as usize].set_constant_buffer(self.binding, buffer)
    }

    /// Set a structured buffer through this register
    pub fn set_structured_buffer(
        &self,
        sets: &mut [Box<dyn DescriptorSet>],
        buffer: &dyn Buffer,
    ) -> Result<()> {
        sets[self.space as usize].set_structured_buffer(self.binding, buffer)
    }

    /// Set one element of a structured-buffer array through this register
    pub fn set_structured_buffer_element(
        &self,
        sets: &mut [Box<dyn DescriptorSet>],
        array_index: u32,
        buffer: &dyn Buffer,
    ) -> Result<()> {
        debug_assert!(array_index < self.count);
        sets[self.space as usize].set_structured_buffer_element(self.binding, array_index, buffer)
    }

    /// Set a read-write texture through this register
    pub fn set_rw_texture(
        &self,
        sets: &mut [Box<dyn DescriptorSet>],
        texture: &dyn Texture,
    ) -> Result<()> {
        sets[self.space as usize].set_rw_texture(self.binding, texture)
    }

    /// Set one element of a sampled-texture array through this register
    pub fn set_texture(
        &self,
        sets: &mut [Box<dyn DescriptorSet>],
        array_index: u32,
        texture: &dyn Texture,
    ) -> Result<()> {
        debug_assert!(array_index < self.count);
        sets[self.space as usize].set_texture(self.binding, array_index, texture)
    }

    /// Set a sampler through this register
    pub fn set_sampler(
        &self,
        sets: &mut [Box<dyn DescriptorSet>],
        sampler: &dyn Sampler,
    ) -> Result<()> {
        sets[self.space as usize].set_sampler(self.binding, sampler)
    }

    /// Set an acceleration structure through this register
    pub fn set_acceleration_structure(
        &self,
        sets: &mut [Box<dyn DescriptorSet>],
        tlas: &dyn Tlas,
    ) -> Result<()> {
        sets[self.space as usize].set_acceleration_structure(self.binding, tlas)
    }
}
