/// Host/device synchronization primitives and per-frame pools
///
/// Fences order host work after GPU completion; binary semaphores order
/// GPU submits against each other (and against swapchain acquire/present).
/// Pools (command, descriptor, query) are recycled wholesale once their
/// flight's fence has signaled.

use crate::error::Result;
use crate::graphics_device::CommandList;

/// Queue family a command pool allocates for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueType {
    Graphics,
    Compute,
    Transfer,
}

/// Host-waitable fence signaled by a GPU submit.
///
/// Created signaled, so the first `wait()` on a freshly built flight
/// returns immediately. Waits are unbounded.
pub trait Fence: Send + Sync {
    /// Debug name given at creation
    fn name(&self) -> &str;

    /// Block until the fence signals
    fn wait(&self);

    /// Return the fence to the unsignaled state
    fn reset(&self);

    /// Whether the fence is currently signaled
    fn is_signaled(&self) -> bool;
}

/// Binary semaphore for GPU-to-GPU ordering across submits
pub trait Semaphore: Send + Sync {}

/// Command pool owning command lists for one queue family
pub trait CommandPool: Send + Sync {
    /// Allocate a command list from the pool
    fn get_command_list(&mut self) -> Result<Box<dyn CommandList>>;

    /// Recycle every command list allocated from the pool
    fn reset(&mut self) -> Result<()>;
}

/// Descriptor pool that per-frame descriptor sets are carved out of
pub trait DescriptorPool: Send + Sync {
    /// Recycle every descriptor set allocated from the pool
    fn reset(&mut self) -> Result<()>;
}

/// Timestamp query pool
pub trait QueryPool: Send + Sync {
    /// Number of queries in the pool
    fn query_count(&self) -> u32;

    /// Recycle all queries
    fn reset(&mut self) -> Result<()>;
}
