//! Main frame loop
//!
//! Drives the N-flight pipelining: every frame waits on the flight's
//! fence, recycles its pools, acquires a swapchain image (waiting out the
//! image's previous user if needed), builds the render context, lets the
//! renderer record and submit, and presents. Present-out-of-date or a
//! window size change triggers the resize path, which drains every
//! flight, recreates the swapchain and per-swap records, resizes the
//! pass-owned targets, and marks shaders dirty for the next frame.
//!
//! The window layer is external; each call to `frame` consumes a
//! `FrameInputs` snapshot the driver translated from its event queue.

use glam::UVec2;
use std::path::PathBuf;
use std::time::Instant;

use crate::camera::{CameraInput, FpsCamera};
use crate::error::Result;
use crate::graphics_device::{AcquireResult, Device, PresentResult, Swapchain};
use crate::render_graph::{PerFlightResource, PerSwapResource, RenderContext, Renderer};
use crate::scene::{SceneDesc, SceneResource};
use crate::shader::{ShaderCache, ShaderCompiler};
use crate::utils::URange32;

const SOURCE: &str = "aurora::FrameLoop";

/// One frame of input state, translated from the window layer
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInputs {
    /// Current window framebuffer resolution; height 0 means minimized
    pub resolution: UVec2,
    /// Whether the shader-reload chord (Ctrl+R) was pressed
    pub reload_shaders_requested: bool,
    /// Camera-relevant input
    pub camera: CameraInput,
    /// Whether the UI layer has focus (camera input is suppressed)
    pub ui_has_focus: bool,
}

/// Everything needed to construct a frame loop
pub struct FrameLoopDesc {
    pub device: Box<dyn Device>,
    pub swapchain: Box<dyn Swapchain>,
    pub shader_compiler: Box<dyn ShaderCompiler>,
    /// Directory holding the pass shader sources
    pub shader_dir: PathBuf,
    /// Directory for the compiled-shader cache
    pub shader_cache_dir: PathBuf,
    /// Number of frames in flight (typically 2-3)
    pub num_flights: usize,
    pub camera: FpsCamera,
}

pub struct FrameLoop {
    device: Box<dyn Device>,
    swapchain: Box<dyn Swapchain>,
    per_flight: Vec<PerFlightResource>,
    per_swap: Vec<PerSwapResource>,
    num_flights: usize,
    flight_cursor: usize,
    scene_resource: SceneResource,
    camera: FpsCamera,
    renderer: Renderer,
    shader_cache: ShaderCache,
    shader_compiler: Box<dyn ShaderCompiler>,
    swapchain_resolution: UVec2,
    is_reload_shader_needed: bool,
    previous_frame_time: Instant,
    average_frame_time_ms: f32,
}

impl FrameLoop {
    pub fn new(desc: FrameLoopDesc) -> Result<Self> {
        let FrameLoopDesc {
            mut device,
            swapchain,
            shader_compiler,
            shader_dir,
            shader_cache_dir,
            num_flights,
            camera,
        } = desc;
        assert!(num_flights >= 1);

        let shader_cache = ShaderCache::new(shader_cache_dir)?;
        let scene_resource = SceneResource::new(device.as_mut())?;

        let mut per_flight = Vec::with_capacity(num_flights);
        for flight_index in 0..num_flights {
            per_flight.push(PerFlightResource::new(
                &format!("frame_loop_flight{}", flight_index),
                device.as_mut(),
            )?);
        }
        let per_swap = PerSwapResource::for_swapchain(swapchain.as_ref())?;

        let swapchain_resolution = UVec2::new(swapchain.width(), swapchain.height());
        let renderer = Renderer::new(
            device.as_mut(),
            &shader_cache,
            shader_compiler.as_ref(),
            shader_dir,
            swapchain.format(),
            swapchain_resolution,
            num_flights,
        )?;

        crate::engine_info!(
            SOURCE,
            "Frame loop up: {} flights, {} swapchain images, {}x{}",
            num_flights,
            swapchain.image_count(),
            swapchain_resolution.x,
            swapchain_resolution.y
        );

        Ok(Self {
            device,
            swapchain,
            per_flight,
            per_swap,
            num_flights,
            flight_cursor: 0,
            scene_resource,
            camera,
            renderer,
            shader_cache,
            shader_compiler,
            swapchain_resolution,
            is_reload_shader_needed: true,
            previous_frame_time: Instant::now(),
            average_frame_time_ms: 16.0,
        })
    }

    // ===== SCENE BUILD (delegated to the scene resource) =====

    /// Load a mesh file into the scene's mega-buffers
    pub fn add_geometries(&mut self, path: &std::path::Path) -> Result<URange32> {
        self.scene_resource.add_geometries(self.device.as_mut(), path)
    }

    /// Group geometry ranges into a base instance
    pub fn add_base_instance(&mut self, geometry_ranges: &[URange32]) -> usize {
        self.scene_resource.add_base_instance(geometry_ranges)
    }

    /// Commit an instance list: build acceleration structures and upload
    /// the indirection tables.
    ///
    /// Re-committing waits for every flight first; scene buffers are
    /// single-writer and the frames in flight are the readers.
    pub fn commit_scene(&mut self, scene_desc: &SceneDesc) -> Result<()> {
        for per_flight in &self.per_flight {
            per_flight.wait();
        }
        self.scene_resource.commit(self.device.as_mut(), scene_desc)
    }

    // ===== PER-FRAME =====

    /// Run one frame. Call once per vsync tick with fresh inputs.
    pub fn frame(&mut self, inputs: &FrameInputs) -> Result<()> {
        let current_resolution = inputs.resolution;
        if current_resolution.y == 0 {
            return Ok(());
        }

        let flight_index = self.flight_cursor;

        // Fold the reload chord with a pending resize-induced reload
        let is_shaders_dirty = self.is_reload_shader_needed || inputs.reload_shaders_requested;
        self.is_reload_shader_needed = false;

        // Wait for this flight's previous frame, then recycle its pools
        self.per_flight[flight_index].wait();
        self.per_flight[flight_index].reset()?;

        let image_index = {
            let image_ready = self.per_flight[flight_index].image_ready_semaphore.as_ref();
            match self.swapchain.acquire_next_image(image_ready)? {
                AcquireResult::Image(image_index) => image_index as usize,
                AcquireResult::OutOfDate => {
                    // Nothing will signal the already-reset flight fence;
                    // flush an empty submit through it before recreating
                    let per_flight = &mut self.per_flight[flight_index];
                    let mut command_list = per_flight.graphics_command_pool.get_command_list()?;
                    command_list.begin()?;
                    command_list.end()?;
                    command_list.submit(&[], &[], Some(per_flight.flight_fence.as_ref()))?;

                    self.handle_resize(current_resolution)?;
                    return Ok(());
                }
            }
        };

        // Before reusing this image, wait out whichever flight last
        // touched it, then claim it for this flight
        if let Some(previous_flight) = self.per_swap[image_index].last_flight_index {
            self.per_flight[previous_flight].flight_fence.wait();
        }
        self.per_swap[image_index].last_flight_index = Some(flight_index);

        // Frame timing for camera motion
        let now = Instant::now();
        let frame_time_ms = now.duration_since(self.previous_frame_time).as_secs_f32() * 1000.0;
        self.previous_frame_time = now;
        self.average_frame_time_ms = self.average_frame_time_ms * 0.9 + frame_time_ms * 0.1;
        let camera_frame_time = (self.average_frame_time_ms * 0.01).min(1.0);

        self.camera.update(
            &inputs.camera,
            current_resolution,
            camera_frame_time,
            !inputs.ui_has_focus,
        );

        {
            let per_flight = &mut self.per_flight[flight_index];
            let per_swap = &self.per_swap[image_index];
            let mut ctx = RenderContext {
                device: self.device.as_mut(),
                graphics_command_pool: per_flight.graphics_command_pool.as_mut(),
                descriptor_pool: per_flight.descriptor_pool.as_mut(),
                image_ready_semaphore: per_flight.image_ready_semaphore.as_ref(),
                image_presentable_semaphore: per_flight.image_presentable_semaphore.as_ref(),
                flight_fence: per_flight.flight_fence.as_ref(),
                swapchain_texture: per_swap.swapchain_texture.as_ref(),
                scene_resource: &self.scene_resource,
                camera: &self.camera,
                shader_cache: &self.shader_cache,
                shader_compiler: self.shader_compiler.as_ref(),
                flight_index,
                image_index,
                resolution: self.swapchain_resolution,
                is_shaders_dirty,
            };
            self.renderer.loop_frame(&mut ctx)?;
        }

        let present_result = {
            let image_presentable = self.per_flight[flight_index]
                .image_presentable_semaphore
                .as_ref();
            self.swapchain.present(image_index as u32, image_presentable)?
        };

        if present_result == PresentResult::OutOfDate
            || current_resolution != self.swapchain_resolution
        {
            self.handle_resize(current_resolution)?;
        }

        self.flight_cursor = (flight_index + 1) % self.num_flights;
        Ok(())
    }

    /// Recreate everything resolution-dependent.
    ///
    /// Drains every flight first; nothing may still be using the old
    /// swapchain images or pass targets.
    fn handle_resize(&mut self, resolution: UVec2) -> Result<()> {
        crate::engine_info!(
            SOURCE,
            "Resizing swapchain {}x{} -> {}x{}",
            self.swapchain_resolution.x,
            self.swapchain_resolution.y,
            resolution.x,
            resolution.y
        );

        for per_flight in &self.per_flight {
            per_flight.wait();
        }

        self.swapchain.recreate(resolution.x, resolution.y)?;
        self.per_swap = PerSwapResource::for_swapchain(self.swapchain.as_ref())?;
        self.renderer.resize(self.device.as_mut(), resolution)?;
        self.is_reload_shader_needed = true;

        self.swapchain_resolution = resolution;
        self.camera.aspect_ratio = resolution.x as f32 / resolution.y as f32;
        Ok(())
    }

    /// Drain every flight before resources are destroyed
    pub fn shutdown(&mut self) -> Result<()> {
        for per_flight in &self.per_flight {
            per_flight.wait();
        }
        self.device.wait_idle()
    }

    // ===== ACCESSORS =====

    pub fn scene_resource(&self) -> &SceneResource {
        &self.scene_resource
    }

    pub fn scene_resource_mut(&mut self) -> (&mut SceneResource, &mut dyn Device) {
        (&mut self.scene_resource, self.device.as_mut())
    }

    pub fn camera(&self) -> &FpsCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut FpsCamera {
        &mut self.camera
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    pub fn per_flight(&self) -> &[PerFlightResource] {
        &self.per_flight
    }

    pub fn per_swap(&self) -> &[PerSwapResource] {
        &self.per_swap
    }

    pub fn resolution(&self) -> UVec2 {
        self.swapchain_resolution
    }
}
