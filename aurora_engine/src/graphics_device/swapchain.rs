/// Swapchain trait - for window presentation
///
/// Manages a set of images presented to the screen in sequence, chained to
/// the rest of the frame through binary semaphores. "Out of date" results
/// are not errors; they are recreate signals handled by the resize path.

use crate::error::Result;
use crate::graphics_device::{Semaphore, Texture, TextureFormat};

/// Result of acquiring a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    /// Image index to render into this frame
    Image(u32),
    /// The surface changed; recreate the swapchain
    OutOfDate,
}

/// Result of presenting a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    Presented,
    /// The surface changed; recreate the swapchain
    OutOfDate,
}

/// Swapchain for presenting rendered images to a window
pub trait Swapchain: Send + Sync {
    /// Acquire the next image, signaling `image_ready` when it is usable.
    ///
    /// May block when the presentation engine is saturated.
    fn acquire_next_image(&mut self, image_ready: &dyn Semaphore) -> Result<AcquireResult>;

    /// Present an acquired image after `wait` signals
    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentResult>;

    /// Recreate the swapchain (e.g., after window resize)
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// Create a texture handle viewing one swapchain image
    fn image_texture(&self, image_index: usize) -> Result<Box<dyn Texture>>;

    /// Get the number of images in the swapchain
    fn image_count(&self) -> usize;

    /// Get the width of the swapchain images in pixels
    fn width(&self) -> u32;

    /// Get the height of the swapchain images in pixels
    fn height(&self) -> u32;

    /// Get the pixel format of the swapchain images
    fn format(&self) -> TextureFormat;
}
