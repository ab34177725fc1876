//! Final composite pass
//!
//! Rasterizes one full-screen triangle that samples the demodulated
//! irradiance, modulated by the G-buffer reflectance, into the current
//! swapchain image. The swapchain image is bracketed
//! present -> color-attachment -> present around the draw.

use crate::error::Result;
use crate::graphics_device::{
    ClearValue, CommandList, DescriptorSet, Device, PipelineRef, RasterPipeline,
    RasterPipelineDesc, Rect2D, Register, Sampler, ShaderBlob, ShaderStage, Texture, TextureFormat,
    TextureState, Viewport,
};
use crate::render_graph::passes::{GBufferTargets, PathTracingTargets};
use crate::render_graph::RenderContext;
use crate::shader::{ShaderCache, ShaderCompiler, ShaderSrc};

const SOURCE: &str = "aurora::CompositePass";
const SHADER_FILE: &str = "final_composite.hlsl";

struct CompositeRegisters;

impl CompositeRegisters {
    const U_DEMODULATED_DIFFUSE: Register = Register::new(0, 0);
    const U_DEMODULATED_SPECULAR: Register = Register::new(0, 1);
    const U_DIFFUSE_REFLECTANCE: Register = Register::new(0, 2);
    const U_SPECULAR_REFLECTANCE: Register = Register::new(0, 3);
    const U_SAMPLER: Register = Register::new(0, 4);
}

pub struct CompositePass {
    raster_pipeline: Box<dyn RasterPipeline>,
    common_sampler: Box<dyn Sampler>,
}

impl CompositePass {
    pub fn new(
        device: &mut dyn Device,
        shader_cache: &ShaderCache,
        shader_compiler: &dyn ShaderCompiler,
        shader_dir: &std::path::Path,
        swapchain_format: TextureFormat,
    ) -> Result<Self> {
        Ok(Self {
            raster_pipeline: build_pipeline(
                device,
                shader_cache,
                shader_compiler,
                shader_dir,
                swapchain_format,
            )?,
            common_sampler: device.create_sampler("final_composite_sampler")?,
        })
    }

    pub fn reload_shaders(
        &mut self,
        device: &mut dyn Device,
        shader_cache: &ShaderCache,
        shader_compiler: &dyn ShaderCompiler,
        shader_dir: &std::path::Path,
        swapchain_format: TextureFormat,
    ) -> Result<()> {
        self.raster_pipeline = build_pipeline(
            device,
            shader_cache,
            shader_compiler,
            shader_dir,
            swapchain_format,
        )?;
        Ok(())
    }

    pub fn render(
        &self,
        command_list: &mut dyn CommandList,
        ctx: &mut RenderContext,
        path_tracing: &PathTracingTargets,
        gbuffer: &GBufferTargets,
    ) -> Result<()> {
        // The irradiance and reflectance targets become sampled inputs
        // for the draw and return to storage for the next frame's trace
        let sampled_inputs: [&dyn Texture; 4] = [
            path_tracing.demodulated_diffuse.as_ref(),
            path_tracing.demodulated_specular.as_ref(),
            gbuffer.diffuse_reflectance.as_ref(),
            gbuffer.specular_reflectance.as_ref(),
        ];
        for texture in sampled_inputs {
            command_list.transition_texture(
                texture,
                TextureState::UnorderedAccess,
                TextureState::ShaderReadOnly,
            )?;
        }
        command_list.transition_texture(
            ctx.swapchain_texture,
            TextureState::Present,
            TextureState::ColorAttachment,
        )?;

        command_list.begin_render_pass(
            ctx.swapchain_texture,
            Some(ClearValue::Color([0.0, 0.0, 0.0, 0.0])),
        )?;
        command_list.set_viewport(Viewport {
            x: 0.0,
            y: 0.0,
            width: ctx.resolution.x as f32,
            height: ctx.resolution.y as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        })?;
        command_list.set_scissor(Rect2D {
            x: 0,
            y: 0,
            width: ctx.resolution.x,
            height: ctx.resolution.y,
        })?;

        command_list.bind_raster_pipeline(self.raster_pipeline.as_ref())?;

        let mut sets: Vec<Box<dyn DescriptorSet>> = vec![ctx.device.create_descriptor_set(
            PipelineRef::Raster(self.raster_pipeline.as_ref()),
            0,
            ctx.descriptor_pool,
        )?];
        CompositeRegisters::U_DEMODULATED_DIFFUSE.set_texture(
            &mut sets,
            0,
            path_tracing.demodulated_diffuse.as_ref(),
        )?;
        CompositeRegisters::U_DEMODULATED_SPECULAR.set_texture(
            &mut sets,
            0,
            path_tracing.demodulated_specular.as_ref(),
        )?;
        CompositeRegisters::U_DIFFUSE_REFLECTANCE.set_texture(
            &mut sets,
            0,
            gbuffer.diffuse_reflectance.as_ref(),
        )?;
        CompositeRegisters::U_SPECULAR_REFLECTANCE.set_texture(
            &mut sets,
            0,
            gbuffer.specular_reflectance.as_ref(),
        )?;
        CompositeRegisters::U_SAMPLER.set_sampler(&mut sets, self.common_sampler.as_ref())?;
        sets[0].update()?;

        command_list.bind_graphics_descriptor_sets(&[sets[0].as_ref()])?;
        // One full-screen triangle; the vertex shader synthesizes the
        // corners from the vertex index
        command_list.draw_instanced(3, 1, 0, 0)?;
        command_list.end_render_pass()?;

        command_list.transition_texture(
            ctx.swapchain_texture,
            TextureState::ColorAttachment,
            TextureState::Present,
        )?;
        for texture in sampled_inputs {
            command_list.transition_texture(
                texture,
                TextureState::ShaderReadOnly,
                TextureState::UnorderedAccess,
            )?;
        }
        Ok(())
    }
}

fn build_pipeline(
    device: &mut dyn Device,
    shader_cache: &ShaderCache,
    shader_compiler: &dyn ShaderCompiler,
    shader_dir: &std::path::Path,
    swapchain_format: TextureFormat,
) -> Result<Box<dyn RasterPipeline>> {
    let shader_path = shader_dir.join(SHADER_FILE);

    let vertex_bytecode = shader_cache.get_or_compile(
        &ShaderSrc::new(ShaderStage::Vertex, &shader_path, "VsMain"),
        shader_compiler,
    )?;
    let fragment_bytecode = shader_cache.get_or_compile(
        &ShaderSrc::new(ShaderStage::Fragment, &shader_path, "FsMain"),
        shader_compiler,
    )?;

    let pipeline = device.create_raster_pipeline(RasterPipelineDesc {
        name: "final_composite_pipeline".to_string(),
        shaders: vec![
            ShaderBlob {
                stage: ShaderStage::Vertex,
                entry: "VsMain".to_string(),
                bytecode: vertex_bytecode,
            },
            ShaderBlob {
                stage: ShaderStage::Fragment,
                entry: "FsMain".to_string(),
                bytecode: fragment_bytecode,
            },
        ],
        color_format: swapchain_format,
    })?;
    crate::engine_debug!(SOURCE, "Built final composite pipeline");
    Ok(pipeline)
}
