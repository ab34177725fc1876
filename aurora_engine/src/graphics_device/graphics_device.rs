/// Device trait - the central factory for GPU resources
///
/// Constructed by a backend plugin and threaded explicitly through
/// constructors and the per-frame `RenderContext`; there is no global
/// device.

use crate::error::Result;
use crate::graphics_device::{
    AccelBuildHint, Blas, BlasGeometryDesc, Buffer, BufferDesc, CommandPool, DescriptorPool,
    DescriptorSet, Fence, QueryPool, QueueType, RasterPipeline, RasterPipelineDesc,
    RayTracingPipeline, RayTracingPipelineDesc, Sampler, Semaphore, ShaderBindingTable, Texture,
    TextureDesc, Tlas, TlasInstanceDesc,
};

/// Reference to either pipeline kind, used where a descriptor-set layout
/// must be resolved from a pipeline
#[derive(Clone, Copy)]
pub enum PipelineRef<'a> {
    Raster(&'a dyn RasterPipeline),
    RayTracing(&'a dyn RayTracingPipeline),
}

/// Main device trait
///
/// Every factory hands back exclusively owned resources; callers decide
/// the ownership structure (the scene resource owns scene GPU memory, the
/// render graph owns frame resources and pass objects).
pub trait Device: Send + Sync {
    /// Create a buffer
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Box<dyn Buffer>>;

    /// Create a texture
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Box<dyn Texture>>;

    /// Create a texture sampler (linear filtering, repeat addressing)
    fn create_sampler(&mut self, name: &str) -> Result<Box<dyn Sampler>>;

    /// Create a fence in the signaled state
    fn create_fence(&mut self, name: &str) -> Result<Box<dyn Fence>>;

    /// Create a binary semaphore
    fn create_semaphore(&mut self, name: &str) -> Result<Box<dyn Semaphore>>;

    /// Create a command pool for one queue family
    fn create_command_pool(&mut self, name: &str, queue: QueueType) -> Result<Box<dyn CommandPool>>;

    /// Create a descriptor pool with capacity for `max_descriptors` sets
    fn create_descriptor_pool(
        &mut self,
        name: &str,
        max_descriptors: u32,
    ) -> Result<Box<dyn DescriptorPool>>;

    /// Create a timestamp query pool
    fn create_query_pool(&mut self, name: &str, query_count: u32) -> Result<Box<dyn QueryPool>>;

    /// Create a raster pipeline from compiled bytecode
    fn create_raster_pipeline(&mut self, desc: RasterPipelineDesc)
        -> Result<Box<dyn RasterPipeline>>;

    /// Create a ray-tracing pipeline from compiled bytecode
    fn create_ray_tracing_pipeline(
        &mut self,
        desc: RayTracingPipelineDesc,
    ) -> Result<Box<dyn RayTracingPipeline>>;

    /// Build the shader binding table for a ray-tracing pipeline
    fn create_shader_binding_table(
        &mut self,
        name: &str,
        pipeline: &dyn RayTracingPipeline,
    ) -> Result<Box<dyn ShaderBindingTable>>;

    /// Allocate a descriptor set for one space of a pipeline's layout
    fn create_descriptor_set(
        &mut self,
        pipeline: PipelineRef,
        space: u32,
        pool: &mut dyn DescriptorPool,
    ) -> Result<Box<dyn DescriptorSet>>;

    /// Build a bottom-level acceleration structure over triangle geometries
    fn build_blas(
        &mut self,
        name: &str,
        geometries: &[BlasGeometryDesc],
        hint: AccelBuildHint,
    ) -> Result<Box<dyn Blas>>;

    /// Build a top-level acceleration structure over instances
    fn build_tlas(&mut self, name: &str, instances: &[TlasInstanceDesc]) -> Result<Box<dyn Tlas>>;

    /// Required row-pitch alignment for buffer-to-texture copies
    fn data_pitch_alignment(&self) -> u64;

    /// Wait for all GPU operations to complete
    fn wait_idle(&mut self) -> Result<()>;
}
