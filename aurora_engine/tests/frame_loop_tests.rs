//! Frame-loop synchronization and resize tests on the headless device

mod test_utils;

use test_utils::TestHarness;

#[test]
fn test_minimized_window_skips_the_frame() {
    let mut harness = TestHarness::new("minimized", 2, 3, 1280, 720);
    let inputs = harness.inputs(1280, 0);
    harness.frame_loop.frame(&inputs).unwrap();
    assert_eq!(harness.stats.present_count(), 0);
}

#[test]
fn test_per_swap_hazard_waits_previous_flight() {
    // N = 2 flights over K = 3 images: the fourth frame reuses image 0,
    // which flight 0 touched last, so flight 1 must wait flight 0's fence
    let mut harness = TestHarness::new("hazard", 2, 3, 1280, 720);
    harness.run_frames(4, 1280, 720);

    let per_swap = harness.frame_loop.per_swap();
    assert_eq!(per_swap[0].last_flight_index, Some(1));
    assert_eq!(per_swap[1].last_flight_index, Some(1));
    assert_eq!(per_swap[2].last_flight_index, Some(0));

    // Flight 0: own waits in frames 0 and 2, plus the hazard wait issued
    // by flight 1 in frame 3. Flight 1: own waits in frames 1 and 3.
    assert_eq!(
        harness.stats.fence_wait_count("frame_loop_flight0_flight_fence"),
        3
    );
    assert_eq!(
        harness.stats.fence_wait_count("frame_loop_flight1_flight_fence"),
        2
    );
}

#[test]
fn test_resize_cycle_recreates_targets_and_leaks_nothing() {
    let mut harness = TestHarness::new("resize", 2, 3, 1280, 720);

    harness.run_frames(5, 1280, 720);
    let depth_info = *harness.frame_loop.renderer().gbuffer_targets().depth.info();
    assert_eq!((depth_info.width, depth_info.height), (1280, 720));

    // Grow: the first frame at the new size renders, presents, then
    // resizes; the camera aspect follows within that frame
    harness.run_frames(5, 1920, 1080);
    assert_eq!(harness.frame_loop.resolution(), aurora_engine::glam::UVec2::new(1920, 1080));
    let targets = harness.frame_loop.renderer().gbuffer_targets();
    assert_eq!(targets.depth.info().width, 1920);
    assert_eq!(targets.shading_normal.info().height, 1080);
    let path_targets = harness.frame_loop.renderer().path_tracing_targets();
    assert_eq!(path_targets.demodulated_diffuse.info().width, 1920);
    assert!((harness.frame_loop.camera().aspect_ratio - 1920.0 / 1080.0).abs() < 1e-6);
    assert_eq!(
        (harness.frame_loop.swapchain().width(), harness.frame_loop.swapchain().height()),
        (1920, 1080)
    );

    // Shrink back
    harness.run_frames(5, 1280, 720);
    let targets = harness.frame_loop.renderer().gbuffer_targets();
    assert_eq!(targets.depth.info().width, 1280);

    // Every frame with a visible window presented
    assert_eq!(harness.stats.present_count(), 15);

    // No fence leaks: only the per-flight fences remain alive
    assert_eq!(harness.stats.alive_fence_count(), 2);

    harness.frame_loop.shutdown().unwrap();
}

#[test]
fn test_reload_chord_recompiles_changed_shaders() {
    // Copy the shader sources into a scratch dir so the test can edit one
    let scratch = std::env::temp_dir().join(format!("aurora_reload_{}", std::process::id()));
    std::fs::create_dir_all(&scratch).unwrap();
    for file in [
        "shared.hlsli",
        "gbuffer_ray_trace.hlsl",
        "path_tracing.hlsl",
        "final_composite.hlsl",
    ] {
        std::fs::copy(
            std::path::Path::new("shaders").join(file),
            scratch.join(file),
        )
        .unwrap();
    }

    let mut harness =
        TestHarness::with_shader_dir("reload", 2, 3, 1280, 720, scratch.clone());

    // Construction compiled all 9 entry points; the initial shaders-dirty
    // frame hits the cache for all of them
    harness.run_frames(2, 1280, 720);
    assert_eq!(harness.compiler.compile_count(), 9);

    // Edit the G-buffer shader, press Ctrl+R: its 3 entry points recompile
    std::thread::sleep(std::time::Duration::from_millis(20));
    let gbuffer_path = scratch.join("gbuffer_ray_trace.hlsl");
    let mut source = std::fs::read_to_string(&gbuffer_path).unwrap();
    source.push_str("\n// edited\n");
    std::fs::write(&gbuffer_path, source).unwrap();

    let mut inputs = harness.inputs(1280, 720);
    inputs.reload_shaders_requested = true;
    harness.frame_loop.frame(&inputs).unwrap();
    assert_eq!(harness.compiler.compile_count(), 12);

    // The next plain frame does not reload again
    harness.run_frames(1, 1280, 720);
    assert_eq!(harness.compiler.compile_count(), 12);

    std::fs::remove_dir_all(&scratch).ok();
}

#[test]
fn test_shutdown_waits_every_flight() {
    let mut harness = TestHarness::new("shutdown", 3, 3, 1280, 720);
    harness.run_frames(2, 1280, 720);

    let waits_before: Vec<u32> = (0..3)
        .map(|flight| {
            harness
                .stats
                .fence_wait_count(&format!("frame_loop_flight{}_flight_fence", flight))
        })
        .collect();

    harness.frame_loop.shutdown().unwrap();

    for (flight, before) in waits_before.iter().enumerate() {
        let after = harness
            .stats
            .fence_wait_count(&format!("frame_loop_flight{}_flight_fence", flight));
        assert_eq!(after, before + 1, "flight {} not drained", flight);
    }
}
