/// Render graph module - per-frame resources, the render context, the
/// pass objects, and the main frame loop

pub mod frame_resources;
pub mod render_context;
pub mod renderer;
pub mod frame_loop;
pub mod passes;

pub use frame_resources::*;
pub use render_context::*;
pub use renderer::*;
pub use frame_loop::*;
