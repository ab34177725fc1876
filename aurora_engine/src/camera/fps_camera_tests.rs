/// Unit tests for fps_camera.rs

use glam::{UVec2, Vec2, Vec3, Vec4};

use crate::camera::{CameraInput, FpsCamera};

fn test_camera() -> FpsCamera {
    FpsCamera::new(
        Vec3::new(10.0, 10.0, 10.0),
        Vec3::ZERO,
        Vec3::Y,
        60f32.to_radians(),
        16.0 / 9.0,
    )
}

#[test]
fn test_aspect_ratio_follows_resolution() {
    let mut camera = test_camera();
    camera.update(&CameraInput::default(), UVec2::new(1920, 1080), 0.016, true);
    assert!((camera.aspect_ratio - 1920.0 / 1080.0).abs() < 1e-6);

    // A minimized window (height 0) leaves the aspect untouched
    camera.update(&CameraInput::default(), UVec2::new(1920, 0), 0.016, true);
    assert!((camera.aspect_ratio - 1920.0 / 1080.0).abs() < 1e-6);
}

#[test]
fn test_forward_motion_moves_along_view_direction() {
    let mut camera = test_camera();
    let direction = camera.direction;
    let origin = camera.origin;

    let input = CameraInput {
        forward: 1.0,
        boost: 1.0,
        ..Default::default()
    };
    camera.update(&input, UVec2::new(1280, 720), 1.0, true);

    let moved = camera.origin - origin;
    assert!(moved.length() > 0.0);
    assert!(moved.normalize().dot(direction) > 0.999);
    assert!(camera.is_moved());
}

#[test]
fn test_input_suppressed_while_ui_focused() {
    let mut camera = test_camera();
    let origin = camera.origin;

    let input = CameraInput {
        forward: 1.0,
        right: 1.0,
        boost: 10.0,
        cursor_delta: Vec2::new(100.0, 50.0),
        rotating: true,
        ..Default::default()
    };
    camera.update(&input, UVec2::new(1280, 720), 1.0, false);

    assert_eq!(camera.origin, origin);
    assert!(!camera.is_moved());
}

#[test]
fn test_rotation_keeps_direction_normalized() {
    let mut camera = test_camera();
    let input = CameraInput {
        cursor_delta: Vec2::new(200.0, 120.0),
        rotating: true,
        boost: 1.0,
        ..Default::default()
    };
    camera.update(&input, UVec2::new(1280, 720), 1.0, true);
    assert!((camera.direction.length() - 1.0).abs() < 1e-4);
}

#[test]
fn test_camera_props_invert_consistently() {
    let camera = test_camera();
    let props = camera.camera_props();

    // The camera origin maps back from the view transform
    let origin = props.view.inverse() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!((origin.truncate() - camera.origin).length() < 1e-4);

    // view_proj composes the two
    let composed = props.proj * props.view;
    assert!((composed.to_cols_array()[0] - props.view_proj.to_cols_array()[0]).abs() < 1e-6);
}
