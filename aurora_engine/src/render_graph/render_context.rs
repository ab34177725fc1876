//! Per-frame render context
//!
//! Everything a pass needs for one frame, borrowed for the duration of
//! the frame. Passes never own scene or frame resources, and there is no
//! global device; this bundle is the only way they reach either.

use glam::UVec2;

use crate::camera::FpsCamera;
use crate::graphics_device::{CommandPool, DescriptorPool, Device, Fence, Semaphore, Texture};
use crate::scene::SceneResource;
use crate::shader::{ShaderCache, ShaderCompiler};

pub struct RenderContext<'a> {
    pub device: &'a mut dyn Device,
    pub graphics_command_pool: &'a mut dyn CommandPool,
    pub descriptor_pool: &'a mut dyn DescriptorPool,
    pub image_ready_semaphore: &'a dyn Semaphore,
    pub image_presentable_semaphore: &'a dyn Semaphore,
    pub flight_fence: &'a dyn Fence,
    pub swapchain_texture: &'a dyn Texture,
    pub scene_resource: &'a SceneResource,
    pub camera: &'a FpsCamera,
    pub shader_cache: &'a ShaderCache,
    pub shader_compiler: &'a dyn ShaderCompiler,
    /// Which flight's per-flight resources this frame uses
    pub flight_index: usize,
    /// Which swapchain image this frame renders into
    pub image_index: usize,
    pub resolution: UVec2,
    /// Whether pass pipelines should be rebuilt from sources this frame
    pub is_shaders_dirty: bool,
}
