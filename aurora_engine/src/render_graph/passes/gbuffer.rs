//! G-buffer generation pass (ray traced)
//!
//! Traces one forced-opaque camera ray per pixel and writes ray depth,
//! shading normal, diffuse/specular reflectance, and roughness into
//! pass-owned screen-space targets. The closest-hit shader recovers the
//! geometry through the bindless indirection rule and fetches material
//! channels by the dual texture-or-constant encoding.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec2};

use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, CommandList, DescriptorSet, Device, HitGroupDesc,
    MemoryResidency, PipelineRef, Register, RayTracingPipeline, RayTracingPipelineDesc, Sampler,
    ShaderBindingTable, ShaderStage, Texture, TextureDesc, TextureFormat, TextureState,
    TextureUsage,
};
use crate::render_graph::RenderContext;
use crate::settings::MAX_NUM_BINDLESS_TEXTURES;
use crate::shader::{ShaderCache, ShaderCompiler, ShaderSrc};

const SOURCE: &str = "aurora::GBufferPass";
const SHADER_FILE: &str = "gbuffer_ray_trace.hlsl";

/// Constant-buffer params, one buffer per flight
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GBufferRayTraceParams {
    camera_inv_view: Mat4,
    camera_inv_proj: Mat4,
    t_min: f32,
    t_max: f32,
    padding: [f32; 2],
}

/// Shader register layout of the pass (space, binding)
struct GBufferRegisters;

impl GBufferRegisters {
    const U_PARAMS: Register = Register::new(0, 0);
    const U_GBUFFER_DEPTH: Register = Register::new(0, 1);
    const U_GBUFFER_SHADING_NORMAL: Register = Register::new(0, 2);
    const U_GBUFFER_DIFFUSE_REFLECTANCE: Register = Register::new(0, 3);
    const U_GBUFFER_SPECULAR_REFLECTANCE: Register = Register::new(0, 4);
    const U_GBUFFER_ROUGHNESS: Register = Register::new(0, 5);
    const U_SCENE_BVH: Register = Register::new(0, 6);
    const U_BASE_INSTANCE_TABLE: Register = Register::new(0, 7);
    const U_GEOMETRY_TABLE: Register = Register::new(0, 8);
    const U_INDICES: Register = Register::new(0, 9);
    const U_COMPACT_VERTICES: Register = Register::new(0, 10);
    const U_MATERIALS: Register = Register::new(0, 11);
    const U_SAMPLER: Register = Register::new(0, 12);
    const U_TEXTURES: Register = Register::array(1, 0, MAX_NUM_BINDLESS_TEXTURES as u32);
}

/// The pass-owned screen-space targets
pub struct GBufferTargets {
    pub depth: Box<dyn Texture>,
    pub shading_normal: Box<dyn Texture>,
    pub diffuse_reflectance: Box<dyn Texture>,
    pub specular_reflectance: Box<dyn Texture>,
    pub roughness: Box<dyn Texture>,
}

impl GBufferTargets {
    fn create(device: &mut dyn Device, resolution: UVec2) -> Result<Self> {
        let target = |device: &mut dyn Device, name: &str, format: TextureFormat| {
            device.create_texture(TextureDesc {
                name: name.to_string(),
                width: resolution.x,
                height: resolution.y,
                format,
                usage: TextureUsage::STORAGE | TextureUsage::SAMPLED,
                initial_state: TextureState::UnorderedAccess,
            })
        };
        Ok(Self {
            depth: target(device, "gbuffer_depth", TextureFormat::R32_SFLOAT)?,
            shading_normal: target(
                device,
                "gbuffer_shading_normal",
                TextureFormat::R32G32B32A32_SFLOAT,
            )?,
            diffuse_reflectance: target(
                device,
                "gbuffer_diffuse_reflectance",
                TextureFormat::R16G16B16A16_SFLOAT,
            )?,
            specular_reflectance: target(
                device,
                "gbuffer_specular_reflectance",
                TextureFormat::R16G16B16A16_SFLOAT,
            )?,
            roughness: target(device, "gbuffer_roughness", TextureFormat::R32_SFLOAT)?,
        })
    }
}

pub struct GBufferPass {
    rt_pipeline: Box<dyn RayTracingPipeline>,
    rt_sbt: Box<dyn ShaderBindingTable>,
    common_sampler: Box<dyn Sampler>,
    params_constant_buffers: Vec<Box<dyn Buffer>>,
    targets: GBufferTargets,
}

impl GBufferPass {
    pub fn new(
        device: &mut dyn Device,
        shader_cache: &ShaderCache,
        shader_compiler: &dyn ShaderCompiler,
        shader_dir: &std::path::Path,
        num_flights: usize,
        resolution: UVec2,
    ) -> Result<Self> {
        let (rt_pipeline, rt_sbt) =
            build_pipeline(device, shader_cache, shader_compiler, shader_dir)?;

        let mut params_constant_buffers = Vec::with_capacity(num_flights);
        for flight_index in 0..num_flights {
            params_constant_buffers.push(device.create_buffer(BufferDesc {
                name: format!("gbuffer_params_cb_{}", flight_index),
                size: std::mem::size_of::<GBufferRayTraceParams>() as u64,
                usage: BufferUsage::CONSTANT,
                residency: MemoryResidency::CpuToGpu,
            })?);
        }

        Ok(Self {
            rt_pipeline,
            rt_sbt,
            common_sampler: device.create_sampler("gbuffer_sampler")?,
            params_constant_buffers,
            targets: GBufferTargets::create(device, resolution)?,
        })
    }

    pub fn targets(&self) -> &GBufferTargets {
        &self.targets
    }

    /// Recreate the pass-owned targets at a new resolution
    pub fn resize(&mut self, device: &mut dyn Device, resolution: UVec2) -> Result<()> {
        self.targets = GBufferTargets::create(device, resolution)?;
        Ok(())
    }

    /// Rebuild the pipeline from (possibly changed) shader sources.
    ///
    /// The old pipeline stays live until the new one built successfully.
    pub fn reload_shaders(
        &mut self,
        device: &mut dyn Device,
        shader_cache: &ShaderCache,
        shader_compiler: &dyn ShaderCompiler,
        shader_dir: &std::path::Path,
    ) -> Result<()> {
        let (rt_pipeline, rt_sbt) =
            build_pipeline(device, shader_cache, shader_compiler, shader_dir)?;
        self.rt_pipeline = rt_pipeline;
        self.rt_sbt = rt_sbt;
        Ok(())
    }

    pub fn render(&self, command_list: &mut dyn CommandList, ctx: &mut RenderContext) -> Result<()> {
        let camera_props = ctx.camera.camera_props();
        let params = GBufferRayTraceParams {
            camera_inv_view: camera_props.view.inverse(),
            camera_inv_proj: camera_props.proj.inverse(),
            t_min: 0.1,
            t_max: 100_000.0,
            padding: [0.0; 2],
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
        GBufferRegisters::U_PARAMS.set_constant_buffer(&mut sets, params_buffer.as_ref())?;
        GBufferRegisters::U_GBUFFER_DEPTH.set_rw_texture(&mut sets, self.targets.depth.as_ref())?;
        GBufferRegisters::U_GBUFFER_SHADING_NORMAL
            .set_rw_texture(&mut sets, self.targets.shading_normal.as_ref())?;
        GBufferRegisters::U_GBUFFER_DIFFUSE_REFLECTANCE
            .set_rw_texture(&mut sets, self.targets.diffuse_reflectance.as_ref())?;
        GBufferRegisters::U_GBUFFER_SPECULAR_REFLECTANCE
            .set_rw_texture(&mut sets, self.targets.specular_reflectance.as_ref())?;
        GBufferRegisters::U_GBUFFER_ROUGHNESS
            .set_rw_texture(&mut sets, self.targets.roughness.as_ref())?;
        if let Some(tlas) = scene.tlas() {
            GBufferRegisters::U_SCENE_BVH.set_acceleration_structure(&mut sets, tlas)?;
        }
        GBufferRegisters::U_BASE_INSTANCE_TABLE
            .set_structured_buffer(&mut sets, scene.base_instance_table_buffer())?;
        GBufferRegisters::U_GEOMETRY_TABLE
            .set_structured_buffer(&mut sets, scene.geometry_table_buffer())?;
        GBufferRegisters::U_INDICES.set_structured_buffer(&mut sets, scene.ibuf_buffer())?;
        GBufferRegisters::U_COMPACT_VERTICES
            .set_structured_buffer(&mut sets, scene.vbuf_packed_buffer())?;
        GBufferRegisters::U_MATERIALS.set_structured_buffer(&mut sets, scene.materials_buffer())?;
        GBufferRegisters::U_SAMPLER.set_sampler(&mut sets, self.common_sampler.as_ref())?;
        for (texture_index, texture) in scene.textures().iter().enumerate() {
            GBufferRegisters::U_TEXTURES.set_texture(
                &mut sets,
                texture_index as u32,
                texture.as_ref(),
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

fn build_pipeline(
    device: &mut dyn Device,
    shader_cache: &ShaderCache,
    shader_compiler: &dyn ShaderCompiler,
    shader_dir: &std::path::Path,
) -> Result<(Box<dyn RayTracingPipeline>, Box<dyn ShaderBindingTable>)> {
    let shader_path = shader_dir.join(SHADER_FILE);

    let mut desc = RayTracingPipelineDesc {
        name: "gbuffer_ray_trace_pipeline".to_string(),
        shaders: Vec::new(),
        hit_groups: Vec::new(),
        attribute_size: 8,
        payload_size: 8,
        max_recursion_depth: 1,
    };

    for (stage, entry) in [
        (ShaderStage::RayGen, "RayGen"),
        (ShaderStage::Miss, "Miss"),
    ] {
        let bytecode = shader_cache.get_or_compile(
            &ShaderSrc::new(stage, &shader_path, entry),
            shader_compiler,
        )?;
        desc.add_shader(stage, entry, bytecode);
    }
    let closest_hit_bytecode = shader_cache.get_or_compile(
        &ShaderSrc::new(ShaderStage::ClosestHit, &shader_path, "ClosestHit"),
        shader_compiler,
    )?;
    let closest_hit_id = desc.add_shader(ShaderStage::ClosestHit, "ClosestHit", closest_hit_bytecode);
    desc.add_hit_group(HitGroupDesc {
        closest_hit: Some(closest_hit_id),
        ..Default::default()
    });

    let rt_pipeline = device.create_ray_tracing_pipeline(desc)?;
    let rt_sbt = device.create_shader_binding_table("gbuffer_ray_trace_sbt", rt_pipeline.as_ref())?;
    crate::engine_debug!(SOURCE, "Built G-buffer ray-trace pipeline");
    Ok((rt_pipeline, rt_sbt))
}
