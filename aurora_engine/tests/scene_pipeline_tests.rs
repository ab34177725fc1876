//! End-to-end scene scenarios on the headless device
//!
//! Drives the real frame loop: scene build, commit, and rendered frames.

mod test_utils;

use aurora_engine::glam::Mat4;
use aurora_engine::scene::{SceneDesc, SceneInstance};
use test_utils::{cube_scene, TestHarness};

#[test]
fn test_empty_scene_renders_three_frames() {
    let mut harness = TestHarness::new("empty_scene", 2, 3, 1280, 720);

    harness
        .frame_loop
        .commit_scene(&SceneDesc::default())
        .unwrap();
    harness.run_frames(3, 1280, 720);

    let scene_resource = harness.frame_loop.scene_resource();
    assert_eq!(scene_resource.blases().len(), 0);
    assert_eq!(scene_resource.tlas().unwrap().instance_count(), 0);

    // Each frame dispatches the two ray-tracing passes and one
    // composite draw, and presents
    assert_eq!(harness.stats.trace_dispatch_count(), 6);
    assert_eq!(harness.stats.draw_count(), 3);
    assert_eq!(harness.stats.present_count(), 3);
}

#[test]
fn test_single_cube_single_instance() {
    let mut harness = TestHarness::new("single_cube", 2, 3, 1280, 720);

    {
        let (scene_resource, device) = harness.frame_loop.scene_resource_mut();
        let range = scene_resource
            .add_source_scene(device, &cube_scene())
            .unwrap();
        assert_eq!(range.len(), 1);
        let base_instance_id = scene_resource.add_base_instance(&[range]);
        assert_eq!(base_instance_id, 0);
    }

    harness
        .frame_loop
        .commit_scene(&SceneDesc {
            instances: vec![SceneInstance {
                base_instance_id: 0,
                hit_group_id: 0,
                transform: Mat4::IDENTITY,
            }],
        })
        .unwrap();

    let scene_resource = harness.frame_loop.scene_resource();
    assert_eq!(scene_resource.geometries()[0].num_vertices, 24);
    assert_eq!(scene_resource.geometries()[0].num_indices, 36);
    assert_eq!(scene_resource.geometry_table().len(), 1);
    assert_eq!(scene_resource.base_instance_table().len(), 1);
    assert_eq!(
        scene_resource.base_instance_table()[0].geometry_table_index_base,
        0
    );
    assert_eq!(scene_resource.tlas().unwrap().instance_count(), 1);
    assert_eq!(scene_resource.blases().len(), 1);

    harness.run_frames(3, 1280, 720);
    assert_eq!(harness.stats.trace_dispatch_count(), 6);

    harness.frame_loop.shutdown().unwrap();
}

#[test]
fn test_recommit_with_more_instances() {
    let mut harness = TestHarness::new("recommit", 2, 3, 1280, 720);

    {
        let (scene_resource, device) = harness.frame_loop.scene_resource_mut();
        let range = scene_resource
            .add_source_scene(device, &cube_scene())
            .unwrap();
        scene_resource.add_base_instance(&[range]);
    }

    let instance = |x: f32| SceneInstance {
        base_instance_id: 0,
        hit_group_id: 0,
        transform: Mat4::from_translation(aurora_engine::glam::Vec3::new(x, 0.0, 0.0)),
    };

    harness
        .frame_loop
        .commit_scene(&SceneDesc {
            instances: vec![instance(0.0)],
        })
        .unwrap();
    harness.run_frames(2, 1280, 720);

    // Re-committing drains the flights, then rebuilds the TLAS
    harness
        .frame_loop
        .commit_scene(&SceneDesc {
            instances: vec![instance(0.0), instance(4.0), instance(8.0)],
        })
        .unwrap();
    harness.run_frames(2, 1280, 720);

    let scene_resource = harness.frame_loop.scene_resource();
    assert_eq!(scene_resource.tlas().unwrap().instance_count(), 3);
    // One BLAS per commit pass over the single base instance
    assert_eq!(scene_resource.blases().len(), 1);
}
