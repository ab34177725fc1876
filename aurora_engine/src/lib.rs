/*!
# Aurora Engine

Core systems of a real-time, hardware ray-traced path tracer:

- **Scene resource**: packs imported meshes into shared mega-buffers
  (splitting meshes that overflow the 16-bit index width), deduplicates
  textures, encodes materials, and builds the BLAS/TLAS plus the bindless
  indirection tables a hit shader dereferences on every ray hit.
- **Emitter CDFs**: the two-level importance-sampling structure over
  emissive triangle meshes and the environment map.
- **Render graph**: per-flight/per-swap frame resources and the main loop
  (acquire, wait, reset, record, submit, present) with resize and shader
  reload handling, plus the G-buffer, path-tracing, and composite passes.
- **Graphics device boundary**: the trait surface a GPU backend plugin
  implements, with a headless implementation for GPU-free runs and tests.

The window layer, mesh parser, image decoder, and shader cross-compiler
are external collaborators reached through narrow seams (`FrameInputs`,
`import`, `image`, `shader::ShaderCompiler`).
*/

// Error handling module
pub mod error;

// Logging module
pub mod log;

// Capacity limits and index-width aliases
pub mod settings;

// Small shared utilities
pub mod utils;

// The GPU API boundary (traits + headless backend)
pub mod graphics_device;

// Asset import adapter (mesh importer + splitter)
pub mod import;

// Scene-level GPU resources
pub mod scene;

// Emitter importance-sampling support
pub mod lighting;

// Camera
pub mod camera;

// Shader sources, compiler seam, bytecode cache
pub mod shader;

// Frame resources, passes, renderer, frame loop
pub mod render_graph;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export math library
pub use glam;
