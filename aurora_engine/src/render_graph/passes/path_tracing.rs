//! Path-tracing pass
//!
//! Reads the G-buffer, spawns cosine-weighted bounce rays, and writes
//! demodulated diffuse and specular irradiance into pass-owned targets.
//! Two payload types (radiance and shadow) coexist in one pipeline via
//! two miss shaders whose indices travel in the constant buffer. The
//! emitter CDF buffers are bound so light importance sampling can run on
//! the GPU.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec2};

use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, CommandList, DescriptorSet, Device, HitGroupDesc,
    MemoryResidency, PipelineRef, Register, RayTracingPipeline, RayTracingPipelineDesc, Sampler,
    ShaderBindingTable, ShaderStage, Texture, TextureDesc, TextureFormat, TextureState,
    TextureUsage,
};
use crate::render_graph::passes::GBufferTargets;
use crate::render_graph::RenderContext;
use crate::settings::{MAX_NUM_BINDLESS_TEXTURES, MAX_NUM_GEOMETRY_TABLE_ENTRIES};
use crate::shader::{ShaderCache, ShaderCompiler, ShaderSrc};

const SOURCE: &str = "aurora::PathTracingPass";
const SHADER_FILE: &str = "path_tracing.hlsl";

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PathTracingParams {
    camera_inv_view: Mat4,
    camera_inv_proj: Mat4,
    radiance_miss_index: u32,
    shadow_miss_index: u32,
    rng_stream_index: u32,
    padding: u32,
}

struct PathTracingRegisters;

impl PathTracingRegisters {
    const U_PARAMS: Register = Register::new(0, 0);
    const U_DEMODULATED_DIFFUSE: Register = Register::new(0, 1);
    const U_DEMODULATED_SPECULAR: Register = Register::new(0, 2);
    const U_GBUFFER_DEPTH: Register = Register::new(0, 3);
    const U_GBUFFER_SHADING_NORMAL: Register = Register::new(0, 4);
    const U_GBUFFER_DIFFUSE_REFLECTANCE: Register = Register::new(0, 5);
    const U_GBUFFER_SPECULAR_REFLECTANCE: Register = Register::new(0, 6);
    const U_GBUFFER_ROUGHNESS: Register = Register::new(0, 7);
    const U_SCENE_BVH: Register = Register::new(0, 8);
    const U_BASE_INSTANCE_TABLE: Register = Register::new(0, 9);
    const U_GEOMETRY_TABLE: Register = Register::new(0, 10);
    const U_INDICES: Register = Register::new(0, 11);
    const U_COMPACT_VERTICES: Register = Register::new(0, 12);
    const U_MATERIALS: Register = Register::new(0, 13);
    const U_EMISSIONS: Register = Register::new(0, 14);
    const U_TOP_LEVEL_EMITTER_CDF: Register = Register::new(0, 15);
    const U_ENVMAP: Register = Register::new(0, 16);
    const U_ENVMAP_CDF: Register = Register::new(0, 17);
    const U_SAMPLER: Register = Register::new(0, 18);
    const U_TEXTURES: Register = Register::array(1, 0, MAX_NUM_BINDLESS_TEXTURES as u32);
    const U_EMITTER_CDFS: Register =
        Register::array(1, 1, MAX_NUM_GEOMETRY_TABLE_ENTRIES as u32);
}

/// Demodulated indirect-light targets owned by the pass
pub struct PathTracingTargets {
    pub demodulated_diffuse: Box<dyn Texture>,
    pub demodulated_specular: Box<dyn Texture>,
}

impl PathTracingTargets {
    fn create(device: &mut dyn Device, resolution: UVec2) -> Result<Self> {
        let target = |device: &mut dyn Device, name: &str| {
            device.create_texture(TextureDesc {
                name: name.to_string(),
                width: resolution.x,
                height: resolution.y,
                format: TextureFormat::R16G16B16A16_SFLOAT,
                usage: TextureUsage::STORAGE | TextureUsage::SAMPLED,
                initial_state: TextureState::UnorderedAccess,
            })
        };
        Ok(Self {
            demodulated_diffuse: target(device, "path_tracing_demodulated_diffuse")?,
            demodulated_specular: target(device, "path_tracing_demodulated_specular")?,
        })
    }
}

pub struct PathTracingPass {
    rt_pipeline: Box<dyn RayTracingPipeline>,
    rt_sbt: Box<dyn ShaderBindingTable>,
    common_sampler: Box<dyn Sampler>,
    params_constant_buffers: Vec<Box<dyn Buffer>>,
    targets: PathTracingTargets,
    radiance_miss_index: u32,
    shadow_miss_index: u32,
}

impl PathTracingPass {
    pub fn new(
        device: &mut dyn Device,
        shader_cache: &ShaderCache,
        shader_compiler: &dyn ShaderCompiler,
        shader_dir: &std::path::Path,
        num_flights: usize,
        resolution: UVec2,
    ) -> Result<Self> {
        let pipeline = build_pipeline(device, shader_cache, shader_compiler, shader_dir)?;

        let mut params_constant_buffers = Vec::with_capacity(num_flights);
        for flight_index in 0..num_flights {
            params_constant_buffers.push(device.create_buffer(BufferDesc {
                name: format!("path_tracing_params_cb_{}", flight_index),
                size: std::mem::size_of::<PathTracingParams>() as u64,
                usage: BufferUsage::CONSTANT,
                residency: MemoryResidency::CpuToGpu,
            })?);
        }

        Ok(Self {
            rt_pipeline: pipeline.rt_pipeline,
            rt_sbt: pipeline.rt_sbt,
            common_sampler: device.create_sampler("path_tracing_sampler")?,
            params_constant_buffers,
            targets: PathTracingTargets::create(device, resolution)?,
            radiance_miss_index: pipeline.radiance_miss_index,
            shadow_miss_index: pipeline.shadow_miss_index,
        })
    }

    pub fn targets(&self) -> &PathTracingTargets {
        &self.targets
    }

    pub fn resize(&mut self, device: &mut dyn Device, resolution: UVec2) -> Result<()> {
        self.targets = PathTracingTargets::create(device, resolution)?;
        Ok(())
    }

    pub fn reload_shaders(
        &mut self,
        device: &mut dyn Device,
        shader_cache: &ShaderCache,
        shader_compiler: &dyn ShaderCompiler,
        shader_dir: &std::path::Path,
    ) -> Result<()> {
        let pipeline = build_pipeline(device, shader_cache, shader_compiler, shader_dir)?;
        self.rt_pipeline = pipeline.rt_pipeline;
        self.rt_sbt = pipeline.rt_sbt;
        self.radiance_miss_index = pipeline.radiance_miss_index;
        self.shadow_miss_index = pipeline.shadow_miss_index;
        Ok(())
    }

    pub fn render(
        &self,
        command_list: &mut dyn CommandList,
        ctx: &mut RenderContext,
        gbuffer: &GBufferTargets,
    ) -> Result<()> {
        let camera_props = ctx.camera.camera_props();
        let params = PathTracingParams {
            camera_inv_view: camera_props.view.inverse(),
            camera_inv_proj: camera_props.proj.inverse(),
            radiance_miss_index: self.radiance_miss_index,
            shadow_miss_index: self.shadow_miss_index,
            rng_stream_index: ctx.flight_index as u32,
            padding: 0,
        };
        let params_buffer = &self.params_constant_buffers[ctx.flight_index];
        params_buffer.update(0, bytemuck::bytes_of(&params))?;

        let mut sets: Vec<Box<dyn DescriptorSet>> = vec![
            ctx.device.create_descriptor_set(
                PipelineRef::RayTracing(self.rt_pipeline.as_ref()),
                0,
                ctx.descriptor_pool,
            )?,
            ctx.device.create_descriptor_set(
                PipelineRef::RayTracing(self.rt_pipeline.as_ref()),
                1,
                ctx.descriptor_pool,
            )?,
        ];

        let scene = ctx.scene_resource;
        PathTracingRegisters::U_PARAMS.set_constant_buffer(&mut sets, params_buffer.as_ref())?;
        PathTracingRegisters::U_DEMODULATED_DIFFUSE
            .set_rw_texture(&mut sets, self.targets.demodulated_diffuse.as_ref())?;
        PathTracingRegisters::U_DEMODULATED_SPECULAR
            .set_rw_texture(&mut sets, self.targets.demodulated_specular.as_ref())?;
        PathTracingRegisters::U_GBUFFER_DEPTH.set_rw_texture(&mut sets, gbuffer.depth.as_ref())?;
        PathTracingRegisters::U_GBUFFER_SHADING_NORMAL
            .set_rw_texture(&mut sets, gbuffer.shading_normal.as_ref())?;
        PathTracingRegisters::U_GBUFFER_DIFFUSE_REFLECTANCE
            .set_rw_texture(&mut sets, gbuffer.diffuse_reflectance.as_ref())?;
        PathTracingRegisters::U_GBUFFER_SPECULAR_REFLECTANCE
            .set_rw_texture(&mut sets, gbuffer.specular_reflectance.as_ref())?;
        PathTracingRegisters::U_GBUFFER_ROUGHNESS
            .set_rw_texture(&mut sets, gbuffer.roughness.as_ref())?;
        if let Some(tlas) = scene.tlas() {
            PathTracingRegisters::U_SCENE_BVH.set_acceleration_structure(&mut sets, tlas)?;
        }
        PathTracingRegisters::U_BASE_INSTANCE_TABLE
            .set_structured_buffer(&mut sets, scene.base_instance_table_buffer())?;
        PathTracingRegisters::U_GEOMETRY_TABLE
            .set_structured_buffer(&mut sets, scene.geometry_table_buffer())?;
        PathTracingRegisters::U_INDICES.set_structured_buffer(&mut sets, scene.ibuf_buffer())?;
        PathTracingRegisters::U_COMPACT_VERTICES
            .set_structured_buffer(&mut sets, scene.vbuf_packed_buffer())?;
        PathTracingRegisters::U_MATERIALS
            .set_structured_buffer(&mut sets, scene.materials_buffer())?;
        PathTracingRegisters::U_EMISSIONS
            .set_structured_buffer(&mut sets, scene.emissions_buffer())?;
        PathTracingRegisters::U_TOP_LEVEL_EMITTER_CDF
            .set_structured_buffer(&mut sets, scene.top_level_cdf_buffer())?;
        PathTracingRegisters::U_ENVMAP.set_texture(&mut sets, 0, scene.envmap_texture())?;
        PathTracingRegisters::U_ENVMAP_CDF
            .set_structured_buffer(&mut sets, scene.envmap_cdf_buffer())?;
        PathTracingRegisters::U_SAMPLER.set_sampler(&mut sets, self.common_sampler.as_ref())?;
        for (texture_index, texture) in scene.textures().iter().enumerate() {
            PathTracingRegisters::U_TEXTURES.set_texture(
                &mut sets,
                texture_index as u32,
                texture.as_ref(),
            )?;
        }
        for geometry_id in 0..scene.geometries().len() {
            PathTracingRegisters::U_EMITTER_CDFS.set_structured_buffer_element(
                &mut sets,
                geometry_id as u32,
                scene.emitter_cdf_buffer(geometry_id as u32),
            )?;
        }

        for set in &mut sets {
            set.update()?;
        }

        command_list.bind_ray_tracing_pipeline(self.rt_pipeline.as_ref())?;
        command_list
            .bind_ray_tracing_descriptor_sets(&[sets[0].as_ref(), sets[1].as_ref()])?;
        command_list.trace_rays(self.rt_sbt.as_ref(), ctx.resolution.x, ctx.resolution.y)?;
        Ok(())
    }
}

struct BuiltPipeline {
    rt_pipeline: Box<dyn RayTracingPipeline>,
    rt_sbt: Box<dyn ShaderBindingTable>,
    radiance_miss_index: u32,
    shadow_miss_index: u32,
}

fn build_pipeline(
    device: &mut dyn Device,
    shader_cache: &ShaderCache,
    shader_compiler: &dyn ShaderCompiler,
    shader_dir: &std::path::Path,
) -> Result<BuiltPipeline> {
    let shader_path = shader_dir.join(SHADER_FILE);

    let mut desc = RayTracingPipelineDesc {
        name: "path_tracing_pipeline".to_string(),
        shaders: Vec::new(),
        hit_groups: Vec::new(),
        attribute_size: 8,
        // The radiance and shadow payloads share the allocation
        payload_size: 32,
        max_recursion_depth: 1,
    };

    let mut compile = |stage: ShaderStage, entry: &str| -> Result<Vec<u8>> {
        shader_cache.get_or_compile(&ShaderSrc::new(stage, &shader_path, entry), shader_compiler)
    };

    let raygen_bytecode = compile(ShaderStage::RayGen, "RayGen")?;
    let miss_bytecode = compile(ShaderStage::Miss, "Miss")?;
    let shadow_miss_bytecode = compile(ShaderStage::Miss, "ShadowMiss")?;
    let closest_hit_bytecode = compile(ShaderStage::ClosestHit, "ClosestHit")?;

    desc.add_shader(ShaderStage::RayGen, "RayGen", raygen_bytecode);
    desc.add_shader(ShaderStage::Miss, "Miss", miss_bytecode);
    desc.add_shader(ShaderStage::Miss, "ShadowMiss", shadow_miss_bytecode);
    let closest_hit_id =
        desc.add_shader(ShaderStage::ClosestHit, "ClosestHit", closest_hit_bytecode);
    desc.add_hit_group(HitGroupDesc {
        closest_hit: Some(closest_hit_id),
        ..Default::default()
    });

    let rt_pipeline = device.create_ray_tracing_pipeline(desc)?;
    let rt_sbt = device.create_shader_binding_table("path_tracing_sbt", rt_pipeline.as_ref())?;
    crate::engine_debug!(SOURCE, "Built path-tracing pipeline");
    Ok(BuiltPipeline {
        rt_pipeline,
        rt_sbt,
        // Miss-shader indices follow declaration order in the pipeline
        radiance_miss_index: 0,
        shadow_miss_index: 1,
    })
}
