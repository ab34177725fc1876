/// Graphics device module - the GPU API boundary the engine core calls out to
///
/// Backend implementations (Vulkan, Direct3D 12, ...) provide concrete
/// types for these traits as external plugins. The engine core never talks
/// to a GPU API directly; everything it needs from the hardware is
/// expressed here.

// Module declarations
pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod sync;
pub mod command_list;
pub mod descriptor;
pub mod pipeline;
pub mod accel;
pub mod swapchain;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use buffer::*;
pub use texture::*;
pub use sync::*;
pub use command_list::*;
pub use descriptor::*;
pub use pipeline::*;
pub use accel::*;
pub use swapchain::*;

// Headless backend (no GPU required) for tests and backend-less runs
pub mod headless;
