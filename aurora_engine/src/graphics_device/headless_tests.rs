/// Unit tests for headless.rs

use crate::graphics_device::headless::{HeadlessDevice, HeadlessSwapchain};
use crate::graphics_device::{
    AcquireResult, BufferDesc, BufferUsage, Device, MemoryResidency, PresentResult, Swapchain,
};

#[test]
fn test_cpu_buffer_update_bounds() {
    let mut device = HeadlessDevice::new();
    let buffer = device
        .create_buffer(BufferDesc {
            name: "staging".to_string(),
            size: 16,
            usage: BufferUsage::TRANSFER_SRC,
            residency: MemoryResidency::CpuOnly,
        })
        .unwrap();

    assert!(buffer.update(0, &[1, 2, 3, 4]).is_ok());
    assert!(buffer.update(12, &[1, 2, 3, 4]).is_ok());
    assert!(buffer.update(13, &[1, 2, 3, 4]).is_err());
}

#[test]
fn test_gpu_only_buffer_rejects_update() {
    let mut device = HeadlessDevice::new();
    let buffer = device
        .create_buffer(BufferDesc {
            name: "device_local".to_string(),
            size: 16,
            usage: BufferUsage::STORAGE | BufferUsage::TRANSFER_DST,
            residency: MemoryResidency::GpuOnly,
        })
        .unwrap();
    assert!(buffer.update(0, &[0]).is_err());
}

#[test]
fn test_fence_lifecycle_and_wait_counting() {
    let mut device = HeadlessDevice::new();
    let stats = device.stats();
    let fence = device.create_fence("test_fence").unwrap();

    // Fences are born signaled
    assert!(fence.is_signaled());
    fence.wait();
    fence.wait();
    assert_eq!(stats.fence_wait_count("test_fence"), 2);
    assert_eq!(stats.fence_wait_count("other_fence"), 0);

    assert_eq!(stats.alive_fence_count(), 1);
    drop(fence);
    assert_eq!(stats.alive_fence_count(), 0);
}

#[test]
fn test_submit_signals_the_fence() {
    let mut device = HeadlessDevice::new();
    let fence = device.create_fence("submit_fence").unwrap();
    let mut pool = device
        .create_command_pool("pool", crate::graphics_device::QueueType::Graphics)
        .unwrap();

    let mut command_list = pool.get_command_list().unwrap();
    command_list.begin().unwrap();
    command_list.end().unwrap();

    fence.reset();
    assert!(!fence.is_signaled());
    command_list.submit(&[], &[], Some(fence.as_ref())).unwrap();
    assert!(fence.is_signaled());
    assert_eq!(device.stats().submit_count(), 1);
}

#[test]
fn test_command_list_enforces_recording_state() {
    let mut device = HeadlessDevice::new();
    let mut pool = device
        .create_command_pool("pool", crate::graphics_device::QueueType::Graphics)
        .unwrap();

    let mut command_list = pool.get_command_list().unwrap();
    // Commands before begin() fail
    assert!(command_list
        .draw_instanced(3, 1, 0, 0)
        .is_err());
    // Submit before end() fails
    command_list.begin().unwrap();
    assert!(command_list.submit(&[], &[], None).is_err());
}

#[test]
fn test_swapchain_round_robins_images() {
    let mut device = HeadlessDevice::new();
    let semaphore = device.create_semaphore("acquire").unwrap();
    let mut swapchain = HeadlessSwapchain::new(&device, 1280, 720, 3);

    let mut acquired = Vec::new();
    for _ in 0..4 {
        match swapchain.acquire_next_image(semaphore.as_ref()).unwrap() {
            AcquireResult::Image(image_index) => acquired.push(image_index),
            AcquireResult::OutOfDate => panic!("headless swapchain never goes out of date"),
        }
    }
    assert_eq!(acquired, vec![0, 1, 2, 0]);

    assert_eq!(
        swapchain.present(0, semaphore.as_ref()).unwrap(),
        PresentResult::Presented
    );
    assert!(swapchain.present(9, semaphore.as_ref()).is_err());
}

#[test]
fn test_swapchain_recreate_changes_extent() {
    let device = HeadlessDevice::new();
    let mut swapchain = HeadlessSwapchain::new(&device, 1280, 720, 2);
    assert_eq!((swapchain.width(), swapchain.height()), (1280, 720));

    swapchain.recreate(1920, 1080).unwrap();
    assert_eq!((swapchain.width(), swapchain.height()), (1920, 1080));

    let image = swapchain.image_texture(0).unwrap();
    assert_eq!(image.info().width, 1920);
    assert_eq!(image.info().height, 1080);
}
