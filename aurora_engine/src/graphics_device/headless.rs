//! Headless graphics device (no GPU required)
//!
//! Implements the whole device boundary without touching a GPU: buffers
//! store bytes, submits complete instantly, fences count their waits, the
//! swapchain hands out image indices round-robin. The frame loop, scene
//! commit, and resize machinery run unchanged on top of it, which is what
//! the integration tests (and backend-less runs of the demo) rely on.

use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::graphics_device::{
    AccelBuildHint, AcquireResult, Blas, BlasGeometryDesc, Buffer, BufferDesc, ClearValue,
    CommandList, CommandPool, DescriptorPool, DescriptorSet, Device, Fence, IndexType,
    MemoryResidency, Pipeline, PipelineRef, PresentResult, QueryPool, QueueType, RasterPipeline,
    RasterPipelineDesc, RayTracingPipeline, RayTracingPipelineDesc, Rect2D, Sampler, Semaphore,
    ShaderBindingTable, ShaderStage, Swapchain, Texture, TextureDesc, TextureFormat, TextureInfo,
    TextureState, Tlas, TlasInstanceDesc, Viewport,
};
use crate::shader::{ShaderCompiler, ShaderSrc};

const PITCH_ALIGNMENT: u64 = 256;

// ============================================================================
// Shared counters
// ============================================================================

/// Counters the headless backend maintains so tests can observe
/// synchronization behavior that has no other side effect.
#[derive(Default)]
pub struct HeadlessStats {
    fence_waits: Mutex<FxHashMap<String, u32>>,
    fence_flags: Mutex<FxHashMap<String, Arc<AtomicBool>>>,
    submits: AtomicU32,
    presents: AtomicU32,
    trace_dispatches: AtomicU32,
    draws: AtomicU32,
    blas_hints: Mutex<Vec<AccelBuildHint>>,
    tlas_builds: AtomicU32,
    fences_alive: AtomicI32,
}

impl HeadlessStats {
    /// How many times the fence with this debug name has been waited on
    pub fn fence_wait_count(&self, fence_name: &str) -> u32 {
        self.fence_waits
            .lock()
            .unwrap()
            .get(fence_name)
            .copied()
            .unwrap_or(0)
    }

    /// Total command-list submits
    pub fn submit_count(&self) -> u32 {
        self.submits.load(Ordering::Relaxed)
    }

    /// Total swapchain presents
    pub fn present_count(&self) -> u32 {
        self.presents.load(Ordering::Relaxed)
    }

    /// Total `trace_rays` dispatches
    pub fn trace_dispatch_count(&self) -> u32 {
        self.trace_dispatches.load(Ordering::Relaxed)
    }

    /// Total draw calls
    pub fn draw_count(&self) -> u32 {
        self.draws.load(Ordering::Relaxed)
    }

    /// Build hints of every BLAS built, in build order
    pub fn blas_hints(&self) -> Vec<AccelBuildHint> {
        self.blas_hints.lock().unwrap().clone()
    }

    /// Total TLAS builds
    pub fn tlas_build_count(&self) -> u32 {
        self.tlas_builds.load(Ordering::Relaxed)
    }

    /// Fences currently alive (created and not yet dropped)
    pub fn alive_fence_count(&self) -> i32 {
        self.fences_alive.load(Ordering::SeqCst)
    }

    fn count_fence_wait(&self, fence_name: &str) {
        *self
            .fence_waits
            .lock()
            .unwrap()
            .entry(fence_name.to_string())
            .or_insert(0) += 1;
    }

    fn register_fence(&self, fence_name: &str, flag: Arc<AtomicBool>) {
        self.fence_flags
            .lock()
            .unwrap()
            .insert(fence_name.to_string(), flag);
    }

    fn signal_fence(&self, fence_name: &str) {
        if let Some(flag) = self.fence_flags.lock().unwrap().get(fence_name) {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// Resources
// ============================================================================

pub struct HeadlessBuffer {
    name: String,
    size: u64,
    residency: MemoryResidency,
    data: Mutex<Vec<u8>>,
}

impl Buffer for HeadlessBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if self.residency == MemoryResidency::GpuOnly {
            return Err(Error::InvalidResource(format!(
                "Buffer '{}' is GPU-only and cannot be mapped",
                self.name
            )));
        }
        if offset + data.len() as u64 > self.size {
            return Err(Error::InvalidResource(format!(
                "Write of {} bytes at offset {} exceeds buffer '{}' size {}",
                data.len(),
                offset,
                self.name,
                self.size
            )));
        }
        let mut storage = self.data.lock().unwrap();
        storage[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }
}

pub struct HeadlessTexture {
    info: TextureInfo,
}

impl Texture for HeadlessTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

pub struct HeadlessSampler;

impl Sampler for HeadlessSampler {}

pub struct HeadlessFence {
    name: String,
    signaled: Arc<AtomicBool>,
    stats: Arc<HeadlessStats>,
}

impl Fence for HeadlessFence {
    fn name(&self) -> &str {
        &self.name
    }

    fn wait(&self) {
        // Submits complete instantly in the headless backend, so a wait on
        // an unsignaled fence would block forever on real hardware.
        debug_assert!(
            self.is_signaled(),
            "wait on fence '{}' that no submit will signal",
            self.name
        );
        self.stats.count_fence_wait(&self.name);
    }

    fn reset(&self) {
        self.signaled.store(false, Ordering::SeqCst);
    }

    fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::SeqCst)
    }
}

impl Drop for HeadlessFence {
    fn drop(&mut self) {
        self.stats.fences_alive.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct HeadlessSemaphore;

impl Semaphore for HeadlessSemaphore {}

pub struct HeadlessCommandPool {
    stats: Arc<HeadlessStats>,
}

impl CommandPool for HeadlessCommandPool {
    fn get_command_list(&mut self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(HeadlessCommandList {
            recording: false,
            ended: false,
            in_render_pass: false,
            stats: Arc::clone(&self.stats),
        }))
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct HeadlessDescriptorPool;

impl DescriptorPool for HeadlessDescriptorPool {
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct HeadlessQueryPool {
    count: u32,
}

impl QueryPool for HeadlessQueryPool {
    fn query_count(&self) -> u32 {
        self.count
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct HeadlessRasterPipeline;

impl Pipeline for HeadlessRasterPipeline {}
impl RasterPipeline for HeadlessRasterPipeline {}

pub struct HeadlessRayTracingPipeline {
    miss_count: u32,
}

impl Pipeline for HeadlessRayTracingPipeline {}
impl RayTracingPipeline for HeadlessRayTracingPipeline {
    fn miss_shader_count(&self) -> u32 {
        self.miss_count
    }
}

pub struct HeadlessShaderBindingTable;

impl ShaderBindingTable for HeadlessShaderBindingTable {}

pub struct HeadlessDescriptorSet;

impl DescriptorSet for HeadlessDescriptorSet {
    fn set_constant_buffer(&mut self, _binding: u32, _buffer: &dyn Buffer) -> Result<()> {
        Ok(())
    }

    fn set_structured_buffer(&mut self, _binding: u32, _buffer: &dyn Buffer) -> Result<()> {
        Ok(())
    }

    fn set_structured_buffer_element(
        &mut self,
        _binding: u32,
        _array_index: u32,
        _buffer: &dyn Buffer,
    ) -> Result<()> {
        Ok(())
    }

    fn set_rw_texture(&mut self, _binding: u32, _texture: &dyn Texture) -> Result<()> {
        Ok(())
    }

    fn set_texture(
        &mut self,
        _binding: u32,
        _array_index: u32,
        _texture: &dyn Texture,
    ) -> Result<()> {
        Ok(())
    }

    fn set_sampler(&mut self, _binding: u32, _sampler: &dyn Sampler) -> Result<()> {
        Ok(())
    }

    fn set_acceleration_structure(&mut self, _binding: u32, _tlas: &dyn Tlas) -> Result<()> {
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct HeadlessBlas {
    geometry_count: usize,
}

impl Blas for HeadlessBlas {
    fn geometry_count(&self) -> usize {
        self.geometry_count
    }
}

pub struct HeadlessTlas {
    instance_count: usize,
}

impl Tlas for HeadlessTlas {
    fn instance_count(&self) -> usize {
        self.instance_count
    }
}

// ============================================================================
// Command list
// ============================================================================

pub struct HeadlessCommandList {
    recording: bool,
    ended: bool,
    in_render_pass: bool,
    stats: Arc<HeadlessStats>,
}

impl HeadlessCommandList {
    fn check_recording(&self) -> Result<()> {
        if !self.recording {
            return Err(Error::BackendError(
                "Command recorded outside begin()/end()".to_string(),
            ));
        }
        Ok(())
    }
}

impl CommandList for HeadlessCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording || self.ended {
            return Err(Error::BackendError(
                "Command list begun twice".to_string(),
            ));
        }
        self.recording = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError(
                "Command list ended inside a render pass".to_string(),
            ));
        }
        self.recording = false;
        self.ended = true;
        Ok(())
    }

    fn copy_buffer_to_buffer(
        &mut self,
        dst: &dyn Buffer,
        dst_offset: u64,
        src: &dyn Buffer,
        src_offset: u64,
        size: u64,
    ) -> Result<()> {
        self.check_recording()?;
        if src_offset + size > src.size() || dst_offset + size > dst.size() {
            return Err(Error::InvalidResource(format!(
                "Buffer copy of {} bytes out of bounds (src {}+{} of {}, dst {}+{} of {})",
                size,
                src_offset,
                size,
                src.size(),
                dst_offset,
                size,
                dst.size()
            )));
        }
        Ok(())
    }

    fn copy_buffer_to_texture(
        &mut self,
        dst: &dyn Texture,
        src: &dyn Buffer,
        src_offset: u64,
        row_pitch: u64,
    ) -> Result<()> {
        self.check_recording()?;
        if row_pitch % PITCH_ALIGNMENT != 0 {
            return Err(Error::InvalidResource(format!(
                "Row pitch {} is not aligned to {}",
                row_pitch, PITCH_ALIGNMENT
            )));
        }
        let info = dst.info();
        let required = src_offset + row_pitch * info.height as u64;
        if required > src.size() {
            return Err(Error::InvalidResource(format!(
                "Texture copy needs {} bytes but staging buffer holds {}",
                required,
                src.size()
            )));
        }
        Ok(())
    }

    fn transition_texture(
        &mut self,
        _texture: &dyn Texture,
        _from: TextureState,
        _to: TextureState,
    ) -> Result<()> {
        self.check_recording()
    }

    fn begin_render_pass(
        &mut self,
        _color_target: &dyn Texture,
        _clear: Option<ClearValue>,
    ) -> Result<()> {
        self.check_recording()?;
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.check_recording()?;
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
        self.check_recording()
    }

    fn set_scissor(&mut self, _scissor: Rect2D) -> Result<()> {
        self.check_recording()
    }

    fn bind_raster_pipeline(&mut self, _pipeline: &dyn RasterPipeline) -> Result<()> {
        self.check_recording()
    }

    fn bind_ray_tracing_pipeline(&mut self, _pipeline: &dyn RayTracingPipeline) -> Result<()> {
        self.check_recording()
    }

    fn bind_graphics_descriptor_sets(&mut self, _sets: &[&dyn DescriptorSet]) -> Result<()> {
        self.check_recording()
    }

    fn bind_ray_tracing_descriptor_sets(&mut self, _sets: &[&dyn DescriptorSet]) -> Result<()> {
        self.check_recording()
    }

    fn bind_vertex_buffer(&mut self, _buffer: &dyn Buffer, _stride: u32) -> Result<()> {
        self.check_recording()
    }

    fn bind_index_buffer(&mut self, _buffer: &dyn Buffer, _index_type: IndexType) -> Result<()> {
        self.check_recording()
    }

    fn draw_instanced(
        &mut self,
        _vertex_count: u32,
        _instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) -> Result<()> {
        self.check_recording()?;
        self.stats.draws.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn trace_rays(
        &mut self,
        _sbt: &dyn ShaderBindingTable,
        _width: u32,
        _height: u32,
    ) -> Result<()> {
        self.check_recording()?;
        self.stats.trace_dispatches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_timestamp(&mut self, _query_pool: &dyn QueryPool, _query_index: u32) -> Result<()> {
        self.check_recording()
    }

    fn submit(
        &mut self,
        _wait_semaphores: &[&dyn Semaphore],
        _signal_semaphores: &[&dyn Semaphore],
        signal_fence: Option<&dyn Fence>,
    ) -> Result<()> {
        if !self.ended {
            return Err(Error::BackendError(
                "Command list submitted before end()".to_string(),
            ));
        }
        self.stats.submits.fetch_add(1, Ordering::Relaxed);
        // "GPU" completion is immediate
        if let Some(fence) = signal_fence {
            self.stats.signal_fence(fence.name());
        }
        Ok(())
    }
}

// ============================================================================
// Swapchain
// ============================================================================

pub struct HeadlessSwapchain {
    width: u32,
    height: u32,
    image_count: usize,
    next_image: usize,
    format: TextureFormat,
    stats: Arc<HeadlessStats>,
}

impl HeadlessSwapchain {
    pub fn new(device: &HeadlessDevice, width: u32, height: u32, image_count: usize) -> Self {
        Self {
            width,
            height,
            image_count,
            next_image: 0,
            format: TextureFormat::B8G8R8A8_UNORM,
            stats: device.stats(),
        }
    }
}

impl Swapchain for HeadlessSwapchain {
    fn acquire_next_image(&mut self, _image_ready: &dyn Semaphore) -> Result<AcquireResult> {
        let image = self.next_image as u32;
        self.next_image = (self.next_image + 1) % self.image_count;
        Ok(AcquireResult::Image(image))
    }

    fn present(&mut self, image_index: u32, _wait: &dyn Semaphore) -> Result<PresentResult> {
        if image_index as usize >= self.image_count {
            return Err(Error::InvalidResource(format!(
                "Presented image index {} of a {}-image swapchain",
                image_index, self.image_count
            )));
        }
        self.stats.presents.fetch_add(1, Ordering::Relaxed);
        Ok(PresentResult::Presented)
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.next_image = 0;
        Ok(())
    }

    fn image_texture(&self, image_index: usize) -> Result<Box<dyn Texture>> {
        if image_index >= self.image_count {
            return Err(Error::InvalidResource(format!(
                "Swapchain image index {} of {}",
                image_index, self.image_count
            )));
        }
        Ok(Box::new(HeadlessTexture {
            info: TextureInfo {
                width: self.width,
                height: self.height,
                format: self.format,
                usage: crate::graphics_device::TextureUsage::COLOR_ATTACHMENT,
            },
        }))
    }

    fn image_count(&self) -> usize {
        self.image_count
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

// ============================================================================
// Shader compiler
// ============================================================================

/// Shader "compiler" that hashes the source description into a small
/// deterministic blob. Lets pipeline creation, the shader cache, and the
/// reload path run without a real cross-compiler.
#[derive(Clone, Default)]
pub struct HeadlessShaderCompiler {
    compile_count: Arc<AtomicUsize>,
}

impl HeadlessShaderCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compilations performed (cache misses)
    pub fn compile_count(&self) -> usize {
        self.compile_count.load(Ordering::Relaxed)
    }
}

impl ShaderCompiler for HeadlessShaderCompiler {
    fn compile(&self, src: &ShaderSrc) -> Result<Vec<u8>> {
        self.compile_count.fetch_add(1, Ordering::Relaxed);
        let mut blob = Vec::with_capacity(16 + src.entry.len());
        blob.extend_from_slice(&(src.entry.len() as u32).to_le_bytes());
        blob.extend_from_slice(src.entry.as_bytes());
        Ok(blob)
    }
}

// ============================================================================
// Device
// ============================================================================

/// Headless implementation of the device boundary
pub struct HeadlessDevice {
    stats: Arc<HeadlessStats>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(HeadlessStats::default()),
        }
    }

    /// Shared counters for test assertions
    pub fn stats(&self) -> Arc<HeadlessStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for HeadlessDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Box<dyn Buffer>> {
        Ok(Box::new(HeadlessBuffer {
            name: desc.name,
            size: desc.size,
            residency: desc.residency,
            data: Mutex::new(vec![0u8; desc.size as usize]),
        }))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Box<dyn Texture>> {
        Ok(Box::new(HeadlessTexture {
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
            },
        }))
    }

    fn create_sampler(&mut self, _name: &str) -> Result<Box<dyn Sampler>> {
        Ok(Box::new(HeadlessSampler))
    }

    fn create_fence(&mut self, name: &str) -> Result<Box<dyn Fence>> {
        let signaled = Arc::new(AtomicBool::new(true));
        self.stats.register_fence(name, Arc::clone(&signaled));
        self.stats.fences_alive.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HeadlessFence {
            name: name.to_string(),
            signaled,
            stats: Arc::clone(&self.stats),
        }))
    }

    fn create_semaphore(&mut self, _name: &str) -> Result<Box<dyn Semaphore>> {
        Ok(Box::new(HeadlessSemaphore))
    }

    fn create_command_pool(
        &mut self,
        _name: &str,
        _queue: QueueType,
    ) -> Result<Box<dyn CommandPool>> {
        Ok(Box::new(HeadlessCommandPool {
            stats: Arc::clone(&self.stats),
        }))
    }

    fn create_descriptor_pool(
        &mut self,
        _name: &str,
        _max_descriptors: u32,
    ) -> Result<Box<dyn DescriptorPool>> {
        Ok(Box::new(HeadlessDescriptorPool))
    }

    fn create_query_pool(&mut self, _name: &str, query_count: u32) -> Result<Box<dyn QueryPool>> {
        Ok(Box::new(HeadlessQueryPool { count: query_count }))
    }

    fn create_raster_pipeline(
        &mut self,
        desc: RasterPipelineDesc,
    ) -> Result<Box<dyn RasterPipeline>> {
        if desc.shaders.is_empty() {
            return Err(Error::InvalidResource(format!(
                "Raster pipeline '{}' has no shaders",
                desc.name
            )));
        }
        Ok(Box::new(HeadlessRasterPipeline))
    }

    fn create_ray_tracing_pipeline(
        &mut self,
        desc: RayTracingPipelineDesc,
    ) -> Result<Box<dyn RayTracingPipeline>> {
        crate::graphics_device::validate_hit_groups(&desc)?;
        let miss_count = desc
            .shaders
            .iter()
            .filter(|s| s.stage == ShaderStage::Miss)
            .count() as u32;
        Ok(Box::new(HeadlessRayTracingPipeline { miss_count }))
    }

    fn create_shader_binding_table(
        &mut self,
        _name: &str,
        _pipeline: &dyn RayTracingPipeline,
    ) -> Result<Box<dyn ShaderBindingTable>> {
        Ok(Box::new(HeadlessShaderBindingTable))
    }

    fn create_descriptor_set(
        &mut self,
        _pipeline: PipelineRef,
        _space: u32,
        _pool: &mut dyn DescriptorPool,
    ) -> Result<Box<dyn DescriptorSet>> {
        Ok(Box::new(HeadlessDescriptorSet))
    }

    fn build_blas(
        &mut self,
        name: &str,
        geometries: &[BlasGeometryDesc],
        hint: AccelBuildHint,
    ) -> Result<Box<dyn Blas>> {
        for (i, geometry) in geometries.iter().enumerate() {
            let vertex_bytes =
                geometry.vertex_offset + geometry.vertex_stride * geometry.vertex_count as u64;
            let index_bytes = geometry.index_offset
                + geometry.index_type.size_bytes() as u64 * geometry.index_count as u64;
            if vertex_bytes > geometry.vertex_buffer.size() {
                return Err(Error::InvalidResource(format!(
                    "BLAS '{}' geometry {} vertex range exceeds buffer size",
                    name, i
                )));
            }
            if index_bytes > geometry.index_buffer.size() {
                return Err(Error::InvalidResource(format!(
                    "BLAS '{}' geometry {} index range exceeds buffer size",
                    name, i
                )));
            }
        }
        self.stats.blas_hints.lock().unwrap().push(hint);
        Ok(Box::new(HeadlessBlas {
            geometry_count: geometries.len(),
        }))
    }

    fn build_tlas(&mut self, _name: &str, instances: &[TlasInstanceDesc]) -> Result<Box<dyn Tlas>> {
        self.stats.tlas_builds.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(HeadlessTlas {
            instance_count: instances.len(),
        }))
    }

    fn data_pitch_alignment(&self) -> u64 {
        PITCH_ALIGNMENT
    }

    fn wait_idle(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "headless_tests.rs"]
mod tests;
