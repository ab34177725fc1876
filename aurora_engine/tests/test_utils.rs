#![allow(dead_code)]
//! Shared helpers for the headless integration tests
//!
//! Builds a complete frame loop on the headless device so the whole
//! acquire/wait/reset/record/submit/present machinery runs without a GPU.

use std::path::PathBuf;
use std::sync::Arc;

use aurora_engine::camera::FpsCamera;
use aurora_engine::glam::{UVec2, Vec3};
use aurora_engine::graphics_device::headless::{
    HeadlessDevice, HeadlessShaderCompiler, HeadlessStats, HeadlessSwapchain,
};
use aurora_engine::import::{SourceMesh, SourceScene};
use aurora_engine::render_graph::{FrameInputs, FrameLoop, FrameLoopDesc};

pub struct TestHarness {
    pub frame_loop: FrameLoop,
    pub stats: Arc<HeadlessStats>,
    pub compiler: HeadlessShaderCompiler,
    cache_dir: PathBuf,
}

impl TestHarness {
    /// Frame loop over a headless device at the given flight/image counts
    pub fn new(tag: &str, num_flights: usize, image_count: usize, width: u32, height: u32) -> Self {
        Self::with_shader_dir(tag, num_flights, image_count, width, height, PathBuf::from("shaders"))
    }

    pub fn with_shader_dir(
        tag: &str,
        num_flights: usize,
        image_count: usize,
        width: u32,
        height: u32,
        shader_dir: PathBuf,
    ) -> Self {
        let device = HeadlessDevice::new();
        let stats = device.stats();
        let swapchain = HeadlessSwapchain::new(&device, width, height, image_count);
        let compiler = HeadlessShaderCompiler::new();

        let cache_dir = std::env::temp_dir().join(format!(
            "aurora_it_cache_{}_{}",
            tag,
            std::process::id()
        ));

        let frame_loop = FrameLoop::new(FrameLoopDesc {
            device: Box::new(device),
            swapchain: Box::new(swapchain),
            shader_compiler: Box::new(compiler.clone()),
            shader_dir,
            shader_cache_dir: cache_dir.clone(),
            num_flights,
            camera: FpsCamera::new(
                Vec3::new(5.0, 5.0, 5.0),
                Vec3::ZERO,
                Vec3::Y,
                60f32.to_radians(),
                width as f32 / height as f32,
            ),
        })
        .expect("frame loop construction");

        Self {
            frame_loop,
            stats,
            compiler,
            cache_dir,
        }
    }

    pub fn inputs(&self, width: u32, height: u32) -> FrameInputs {
        FrameInputs {
            resolution: UVec2::new(width, height),
            ..Default::default()
        }
    }

    /// Run `count` frames at a fixed resolution
    pub fn run_frames(&mut self, count: usize, width: u32, height: u32) {
        let inputs = self.inputs(width, height);
        for _ in 0..count {
            self.frame_loop.frame(&inputs).expect("frame");
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.cache_dir).ok();
    }
}

/// A 24-vertex, 36-index unit cube built from six quad faces
pub fn cube_scene() -> SourceScene {
    let face_corners = [
        [Vec3::ZERO, Vec3::X, Vec3::X + Vec3::Y, Vec3::Y],
        [Vec3::Z, Vec3::X + Vec3::Z, Vec3::ONE, Vec3::Y + Vec3::Z],
        [Vec3::ZERO, Vec3::Y, Vec3::Y + Vec3::Z, Vec3::Z],
        [Vec3::X, Vec3::X + Vec3::Y, Vec3::ONE, Vec3::X + Vec3::Z],
        [Vec3::ZERO, Vec3::Z, Vec3::X + Vec3::Z, Vec3::X],
        [Vec3::Y, Vec3::Y + Vec3::Z, Vec3::ONE, Vec3::X + Vec3::Y],
    ];
    let mut positions = Vec::new();
    let mut faces = Vec::new();
    for corners in face_corners {
        let base = positions.len() as u32;
        positions.extend_from_slice(&corners);
        faces.push(vec![base, base + 1, base + 2, base + 3]);
    }
    SourceScene {
        meshes: vec![SourceMesh::from_polygons(positions, vec![], vec![], &faces, None)],
        materials: Vec::new(),
    }
}
