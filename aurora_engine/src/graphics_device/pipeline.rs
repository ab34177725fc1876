/// Pipeline descriptors and pipeline traits
///
/// Pipelines are built from compiled bytecode blobs; the cross-compiler
/// that produces the blobs lives behind `shader::ShaderCompiler`.

use crate::error::Result;
use crate::graphics_device::TextureFormat;

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    RayGen,
    Miss,
    ClosestHit,
    AnyHit,
    Intersection,
}

/// A compiled shader: stage, entry point, bytecode
#[derive(Debug, Clone)]
pub struct ShaderBlob {
    pub stage: ShaderStage,
    pub entry: String,
    pub bytecode: Vec<u8>,
}

/// Descriptor for creating a raster pipeline
#[derive(Debug, Clone)]
pub struct RasterPipelineDesc {
    /// Debug name
    pub name: String,
    /// Vertex + fragment shaders
    pub shaders: Vec<ShaderBlob>,
    /// Format of the single color attachment
    pub color_format: TextureFormat,
}

/// A hit group: indices into the pipeline's shader list
///
/// An instance's hit-group offset selects which group runs on
/// intersection.
#[derive(Debug, Clone, Copy, Default)]
pub struct HitGroupDesc {
    pub closest_hit: Option<usize>,
    pub any_hit: Option<usize>,
    pub intersection: Option<usize>,
}

/// Descriptor for creating a ray-tracing pipeline
#[derive(Debug, Clone)]
pub struct RayTracingPipelineDesc {
    /// Debug name
    pub name: String,
    /// All shaders: raygen, miss shaders, hit shaders
    pub shaders: Vec<ShaderBlob>,
    /// Hit groups referencing `shaders` by index
    pub hit_groups: Vec<HitGroupDesc>,
    /// Size in bytes of the hit attributes (barycentrics)
    pub attribute_size: u32,
    /// Size in bytes of the largest ray payload
    pub payload_size: u32,
    /// Maximum trace recursion depth
    pub max_recursion_depth: u32,
}

impl RayTracingPipelineDesc {
    /// Append a shader, returning its index for hit-group wiring
    pub fn add_shader(&mut self, stage: ShaderStage, entry: &str, bytecode: Vec<u8>) -> usize {
        let id = self.shaders.len();
        self.shaders.push(ShaderBlob {
            stage,
            entry: entry.to_string(),
            bytecode,
        });
        id
    }

    /// Append a hit group, returning its index
    pub fn add_hit_group(&mut self, hit_group: HitGroupDesc) -> usize {
        let id = self.hit_groups.len();
        self.hit_groups.push(hit_group);
        id
    }
}

/// Common pipeline trait, needed to carve descriptor sets off a layout
pub trait Pipeline: Send + Sync {}

/// Raster (vertex + fragment) pipeline
pub trait RasterPipeline: Pipeline {}

/// Ray-tracing pipeline
pub trait RayTracingPipeline: Pipeline {
    /// Number of miss shaders in the pipeline, in declaration order.
    ///
    /// Miss-shader *indices* recorded in pass constants refer to this
    /// ordering.
    fn miss_shader_count(&self) -> u32;
}

/// Shader binding table built for one ray-tracing pipeline
pub trait ShaderBindingTable: Send + Sync {}

/// Validate that every hit group references an existing shader
pub fn validate_hit_groups(desc: &RayTracingPipelineDesc) -> Result<()> {
    for (i, group) in desc.hit_groups.iter().enumerate() {
        for shader_id in [group.closest_hit, group.any_hit, group.intersection]
            .into_iter()
            .flatten()
        {
            if shader_id >= desc.shaders.len() {
                crate::engine_bail!(
                    "aurora::Pipeline",
                    "Hit group {} of pipeline '{}' references shader {} but only {} shaders exist",
                    i,
                    desc.name,
                    shader_id,
                    desc.shaders.len()
                );
            }
        }
    }
    Ok(())
}
