//! Aurora demo driver
//!
//! Opens a window, constructs a device, loads a hard-coded mesh path into
//! the scene resource, commits a single-instance scene, and runs the main
//! loop. Window events are folded into a `FrameInputs` snapshot per frame;
//! Ctrl+R reloads shaders, dragging the left mouse button rotates the
//! camera, WASD/Space/Ctrl fly it.
//!
//! GPU backends are plugins; this driver runs on the headless device when
//! none is linked, which still exercises the full frame loop.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use aurora_engine::camera::{CameraInput, FpsCamera};
use aurora_engine::engine_info;
use aurora_engine::engine_warn;
use glam::{Mat4, UVec2, Vec2, Vec3};
use aurora_engine::graphics_device::headless::{HeadlessDevice, HeadlessShaderCompiler, HeadlessSwapchain};
use aurora_engine::render_graph::{FrameInputs, FrameLoop, FrameLoopDesc};
use aurora_engine::scene::{SceneDesc, SceneInstance};

use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const SOURCE: &str = "aurora::Demo";

const NUM_FLIGHTS: usize = 2;
const NUM_SWAPCHAIN_IMAGES: usize = 3;
const SCENE_PATH: &str = "assets/sponza/sponza.obj";

#[derive(Default)]
struct DemoApp {
    window: Option<Window>,
    frame_loop: Option<FrameLoop>,
    pressed_keys: HashSet<KeyCode>,
    reload_requested: bool,
    mouse_held: bool,
    cursor_position: Vec2,
    previous_cursor_position: Vec2,
}

impl DemoApp {
    fn build_frame_loop(&self, resolution: UVec2) -> FrameLoop {
        let device = HeadlessDevice::new();
        let swapchain =
            HeadlessSwapchain::new(&device, resolution.x, resolution.y, NUM_SWAPCHAIN_IMAGES);

        let mut frame_loop = FrameLoop::new(FrameLoopDesc {
            device: Box::new(device),
            swapchain: Box::new(swapchain),
            shader_compiler: Box::new(HeadlessShaderCompiler::new()),
            shader_dir: PathBuf::from("aurora_engine/shaders"),
            shader_cache_dir: PathBuf::from("shader_cache"),
            num_flights: NUM_FLIGHTS,
            camera: FpsCamera::new(
                Vec3::new(10.0, 10.0, 10.0),
                Vec3::ZERO,
                Vec3::Y,
                60f32.to_radians(),
                resolution.x as f32 / resolution.y as f32,
            ),
        })
        .expect("frame loop construction");

        // Hard-coded demo scene: one base instance, one identity instance
        let mut scene_desc = SceneDesc::default();
        match frame_loop.add_geometries(Path::new(SCENE_PATH)) {
            Ok(geometries) => {
                let base_instance_id = frame_loop.add_base_instance(&[geometries]);
                scene_desc.instances.push(SceneInstance {
                    base_instance_id: base_instance_id as u32,
                    hit_group_id: 0,
                    transform: Mat4::IDENTITY,
                });
            }
            Err(e) => {
                engine_warn!(SOURCE, "Demo scene unavailable ({}); rendering empty scene", e);
            }
        }
        frame_loop
            .commit_scene(&scene_desc)
            .expect("scene commit");
        frame_loop
    }

    fn collect_inputs(&mut self, resolution: UVec2) -> FrameInputs {
        let pressed = |key: KeyCode| -> f32 {
            if self.pressed_keys.contains(&key) {
                1.0
            } else {
                0.0
            }
        };

        let camera = CameraInput {
            forward: pressed(KeyCode::KeyW) - pressed(KeyCode::KeyS),
            right: pressed(KeyCode::KeyD) - pressed(KeyCode::KeyA),
            up: pressed(KeyCode::Space) - pressed(KeyCode::ControlLeft),
            boost: if self.pressed_keys.contains(&KeyCode::ShiftLeft) {
                10.0
            } else {
                1.0
            },
            cursor_delta: self.cursor_position - self.previous_cursor_position,
            rotating: self.mouse_held,
        };
        self.previous_cursor_position = self.cursor_position;

        let inputs = FrameInputs {
            resolution,
            reload_shaders_requested: self.reload_requested,
            camera,
            ui_has_focus: false,
        };
        self.reload_requested = false;
        inputs
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title("aurora")
                    .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720)),
            )
            .expect("window creation");

        let size = window.inner_size();
        self.frame_loop = Some(self.build_frame_loop(UVec2::new(size.width, size.height)));
        self.window = Some(window);
        engine_info!(SOURCE, "Demo up at {}x{}", size.width, size.height);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(frame_loop) = self.frame_loop.as_mut() {
                    frame_loop.shutdown().expect("shutdown drain");
                }
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if key == KeyCode::KeyR
                                && self.pressed_keys.contains(&KeyCode::ControlLeft)
                                && !event.repeat
                            {
                                self.reload_requested = true;
                            }
                            self.pressed_keys.insert(key);
                        }
                        ElementState::Released => {
                            self.pressed_keys.remove(&key);
                        }
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_held = state == ElementState::Pressed;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = Vec2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::RedrawRequested => {
                let resolution = self
                    .window
                    .as_ref()
                    .map(|window| {
                        let size = window.inner_size();
                        UVec2::new(size.width, size.height)
                    })
                    .unwrap_or(UVec2::ZERO);

                let inputs = self.collect_inputs(resolution);
                if let Some(frame_loop) = self.frame_loop.as_mut() {
                    if let Err(e) = frame_loop.frame(&inputs) {
                        aurora_engine::engine_error!(SOURCE, "Frame failed: {}", e);
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn main() {
    let event_loop = EventLoop::new().expect("event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::default();
    if let Err(e) = event_loop.run_app(&mut app) {
        aurora_engine::engine_error!(SOURCE, "Event loop error: {}", e);
    }
}
