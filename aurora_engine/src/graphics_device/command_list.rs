/// CommandList trait - for recording and submitting GPU commands
///
/// Commands execute in submission order modulo explicit barriers. A submit
/// may wait on and signal binary semaphores and signal one fence; that is
/// the only cross-submit ordering the engine relies on.

use crate::error::Result;
use crate::graphics_device::{
    Buffer, DescriptorSet, Fence, IndexType, QueryPool, RasterPipeline, RayTracingPipeline,
    Semaphore, ShaderBindingTable, Texture, TextureState,
};

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Command list for recording rendering and transfer commands
pub trait CommandList: Send + Sync {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Copy `size` bytes between buffers
    fn copy_buffer_to_buffer(
        &mut self,
        dst: &dyn Buffer,
        dst_offset: u64,
        src: &dyn Buffer,
        src_offset: u64,
        size: u64,
    ) -> Result<()>;

    /// Copy a staging buffer into a whole texture.
    ///
    /// `row_pitch` is the aligned byte distance between rows in `src`;
    /// callers align it to `Device::data_pitch_alignment()`.
    fn copy_buffer_to_texture(
        &mut self,
        dst: &dyn Texture,
        src: &dyn Buffer,
        src_offset: u64,
        row_pitch: u64,
    ) -> Result<()>;

    /// Transition a texture between tracked states
    fn transition_texture(
        &mut self,
        texture: &dyn Texture,
        from: TextureState,
        to: TextureState,
    ) -> Result<()>;

    /// Begin a render pass targeting one color attachment
    fn begin_render_pass(
        &mut self,
        color_target: &dyn Texture,
        clear: Option<ClearValue>,
    ) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a raster pipeline
    fn bind_raster_pipeline(&mut self, pipeline: &dyn RasterPipeline) -> Result<()>;

    /// Bind a ray-tracing pipeline
    fn bind_ray_tracing_pipeline(&mut self, pipeline: &dyn RayTracingPipeline) -> Result<()>;

    /// Bind descriptor sets to the bound raster pipeline, one per space
    fn bind_graphics_descriptor_sets(&mut self, sets: &[&dyn DescriptorSet]) -> Result<()>;

    /// Bind descriptor sets to the bound ray-tracing pipeline, one per space
    fn bind_ray_tracing_descriptor_sets(&mut self, sets: &[&dyn DescriptorSet]) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, stride: u32) -> Result<()>;

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, index_type: IndexType) -> Result<()>;

    /// Draw instanced, non-indexed
    fn draw_instanced(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()>;

    /// Dispatch the bound ray-tracing pipeline over a width x height grid
    fn trace_rays(&mut self, sbt: &dyn ShaderBindingTable, width: u32, height: u32) -> Result<()>;

    /// Write a timestamp into a query pool slot
    fn write_timestamp(&mut self, query_pool: &dyn QueryPool, query_index: u32) -> Result<()>;

    /// Submit the recorded commands.
    ///
    /// The submit waits on `wait_semaphores`, signals `signal_semaphores`
    /// when the commands finish, and signals `signal_fence` for the host.
    fn submit(
        &mut self,
        wait_semaphores: &[&dyn Semaphore],
        signal_semaphores: &[&dyn Semaphore],
        signal_fence: Option<&dyn Fence>,
    ) -> Result<()>;
}
