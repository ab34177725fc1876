//! Renderer - owns the pass objects and records one frame
//!
//! Each frame it records a single graphics command list that generates
//! the G-buffer, traces paths, and composites to the swapchain image,
//! then submits it waiting on `image_ready` and signaling
//! `image_presentable` plus the flight fence.

use glam::UVec2;
use std::path::PathBuf;

use crate::error::Result;
use crate::graphics_device::{Device, TextureFormat};
use crate::render_graph::passes::{CompositePass, GBufferPass, GBufferTargets, PathTracingPass, PathTracingTargets};
use crate::render_graph::RenderContext;
use crate::shader::{ShaderCache, ShaderCompiler};

const SOURCE: &str = "aurora::Renderer";

pub struct Renderer {
    gbuffer_pass: GBufferPass,
    path_tracing_pass: PathTracingPass,
    composite_pass: CompositePass,
    shader_dir: PathBuf,
    swapchain_format: TextureFormat,
}

impl Renderer {
    pub fn new(
        device: &mut dyn Device,
        shader_cache: &ShaderCache,
        shader_compiler: &dyn ShaderCompiler,
        shader_dir: PathBuf,
        swapchain_format: TextureFormat,
        resolution: UVec2,
        num_flights: usize,
    ) -> Result<Self> {
        let gbuffer_pass = GBufferPass::new(
            device,
            shader_cache,
            shader_compiler,
            &shader_dir,
            num_flights,
            resolution,
        )?;
        let path_tracing_pass = PathTracingPass::new(
            device,
            shader_cache,
            shader_compiler,
            &shader_dir,
            num_flights,
            resolution,
        )?;
        let composite_pass = CompositePass::new(
            device,
            shader_cache,
            shader_compiler,
            &shader_dir,
            swapchain_format,
        )?;
        Ok(Self {
            gbuffer_pass,
            path_tracing_pass,
            composite_pass,
            shader_dir,
            swapchain_format,
        })
    }

    pub fn gbuffer_targets(&self) -> &GBufferTargets {
        self.gbuffer_pass.targets()
    }

    pub fn path_tracing_targets(&self) -> &PathTracingTargets {
        self.path_tracing_pass.targets()
    }

    /// Record and submit one frame
    pub fn loop_frame(&mut self, ctx: &mut RenderContext) -> Result<()> {
        if ctx.is_shaders_dirty {
            self.reload_shaders(ctx.device, ctx.shader_cache, ctx.shader_compiler);
        }

        let mut command_list = ctx.graphics_command_pool.get_command_list()?;
        command_list.begin()?;
        self.gbuffer_pass.render(command_list.as_mut(), ctx)?;
        self.path_tracing_pass
            .render(command_list.as_mut(), ctx, self.gbuffer_pass.targets())?;
        self.composite_pass.render(
            command_list.as_mut(),
            ctx,
            self.path_tracing_pass.targets(),
            self.gbuffer_pass.targets(),
        )?;
        command_list.end()?;

        command_list.submit(
            &[ctx.image_ready_semaphore],
            &[ctx.image_presentable_semaphore],
            Some(ctx.flight_fence),
        )?;
        Ok(())
    }

    /// Recreate the pass-owned targets after a swapchain resize
    pub fn resize(&mut self, device: &mut dyn Device, resolution: UVec2) -> Result<()> {
        self.gbuffer_pass.resize(device, resolution)?;
        self.path_tracing_pass.resize(device, resolution)?;
        crate::engine_info!(SOURCE, "Resized pass targets to {}x{}", resolution.x, resolution.y);
        Ok(())
    }

    /// Rebuild every pass pipeline from sources.
    ///
    /// A failed compile aborts the reload for that pass and keeps its
    /// previous pipeline live; the diagnostic is logged.
    fn reload_shaders(
        &mut self,
        device: &mut dyn Device,
        shader_cache: &ShaderCache,
        shader_compiler: &dyn ShaderCompiler,
    ) {
        if let Err(e) = self.gbuffer_pass.reload_shaders(
            device,
            shader_cache,
            shader_compiler,
            &self.shader_dir,
        ) {
            crate::engine_error!(SOURCE, "G-buffer shader reload failed, keeping previous pipeline: {}", e);
        }
        if let Err(e) = self.path_tracing_pass.reload_shaders(
            device,
            shader_cache,
            shader_compiler,
            &self.shader_dir,
        ) {
            crate::engine_error!(SOURCE, "Path-tracing shader reload failed, keeping previous pipeline: {}", e);
        }
        if let Err(e) = self.composite_pass.reload_shaders(
            device,
            shader_cache,
            shader_compiler,
            &self.shader_dir,
            self.swapchain_format,
        ) {
            crate::engine_error!(SOURCE, "Composite shader reload failed, keeping previous pipeline: {}", e);
        }
    }
}
