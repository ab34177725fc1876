//! Per-flight and per-swap frame resources
//!
//! A flight owns everything one in-flight frame recycles wholesale: its
//! fence, one command pool per queue family, a descriptor pool, the two
//! binary semaphores of the acquire/present chain, and a timestamp query
//! pool. `wait()` blocks until the flight's previous GPU work finished;
//! `reset()` then recycles every pool.
//!
//! A per-swap record tracks which flight last submitted work touching its
//! swapchain image; before the image is reused, that flight's fence is
//! waited. This is the only reason a new flight ever waits on an older
//! one.

use std::time::Instant;

use crate::error::Result;
use crate::graphics_device::{
    CommandPool, DescriptorPool, Device, Fence, QueryPool, QueueType, Semaphore, Swapchain,
    Texture,
};

const NUM_DESCRIPTORS: u32 = 1000;
const NUM_QUERIES: u32 = 1000;

pub struct PerFlightResource {
    pub flight_fence: Box<dyn Fence>,
    pub graphics_command_pool: Box<dyn CommandPool>,
    pub compute_command_pool: Box<dyn CommandPool>,
    pub transfer_command_pool: Box<dyn CommandPool>,
    pub descriptor_pool: Box<dyn DescriptorPool>,
    pub image_ready_semaphore: Box<dyn Semaphore>,
    pub image_presentable_semaphore: Box<dyn Semaphore>,
    pub timestamp_query_pool: Box<dyn QueryPool>,
    host_reset_time: Instant,
}

impl PerFlightResource {
    pub fn new(name: &str, device: &mut dyn Device) -> Result<Self> {
        Ok(Self {
            flight_fence: device.create_fence(&format!("{}_flight_fence", name))?,
            graphics_command_pool: device
                .create_command_pool(&format!("{}_graphics_command_pool", name), QueueType::Graphics)?,
            compute_command_pool: device
                .create_command_pool(&format!("{}_compute_command_pool", name), QueueType::Compute)?,
            transfer_command_pool: device
                .create_command_pool(&format!("{}_transfer_command_pool", name), QueueType::Transfer)?,
            descriptor_pool: device
                .create_descriptor_pool(&format!("{}_descriptor_pool", name), NUM_DESCRIPTORS)?,
            image_ready_semaphore: device
                .create_semaphore(&format!("{}_image_ready_semaphore", name))?,
            image_presentable_semaphore: device
                .create_semaphore(&format!("{}_image_presentable_semaphore", name))?,
            timestamp_query_pool: device
                .create_query_pool(&format!("{}_timestamp_query_pool", name), NUM_QUERIES)?,
            host_reset_time: Instant::now(),
        })
    }

    /// Block until this flight's previous GPU work completed
    pub fn wait(&self) {
        self.flight_fence.wait();
    }

    /// Recycle the fence and every pool for the next frame
    pub fn reset(&mut self) -> Result<()> {
        self.host_reset_time = Instant::now();
        self.flight_fence.reset();
        self.graphics_command_pool.reset()?;
        self.compute_command_pool.reset()?;
        self.transfer_command_pool.reset()?;
        self.descriptor_pool.reset()?;
        self.timestamp_query_pool.reset()?;
        Ok(())
    }

    /// When this flight was last reset on the host
    pub fn host_reset_time(&self) -> Instant {
        self.host_reset_time
    }
}

pub struct PerSwapResource {
    /// Texture handle viewing this swapchain image
    pub swapchain_texture: Box<dyn Texture>,
    /// Flight that most recently submitted work touching this image;
    /// its fence must signal before the image is reused
    pub last_flight_index: Option<usize>,
}

impl PerSwapResource {
    pub fn new(swapchain: &dyn Swapchain, image_index: usize) -> Result<Self> {
        Ok(Self {
            swapchain_texture: swapchain.image_texture(image_index)?,
            last_flight_index: None,
        })
    }

    /// Build one record per swapchain image
    pub fn for_swapchain(swapchain: &dyn Swapchain) -> Result<Vec<Self>> {
        (0..swapchain.image_count())
            .map(|image_index| Self::new(swapchain, image_index))
            .collect()
    }
}
