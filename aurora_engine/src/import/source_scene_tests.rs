/// Unit tests for source_scene.rs
///
/// Builds synthetic meshes directly; OBJ reading itself is exercised
/// through a small file written to a temp directory.

use glam::{Vec2, Vec3};
use std::io::Write;

use crate::import::{SourceMesh, SourceScene};

fn quad_mesh() -> SourceMesh {
    SourceMesh::from_polygons(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        vec![Vec3::Z; 4],
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
        &[vec![0, 1, 2, 3]],
        Some(0),
    )
}

#[test]
fn test_face_access() {
    let mesh = quad_mesh();
    assert_eq!(mesh.num_faces(), 1);
    assert_eq!(mesh.face(0), &[0, 1, 2, 3]);
    assert_eq!(mesh.num_vertices(), 4);
}

#[test]
fn test_shading_normal_substitutes_degenerate() {
    let mesh = SourceMesh::from_polygons(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        vec![Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0), Vec3::Y],
        vec![],
        &[vec![0, 1, 2]],
        None,
    );
    // Zero normal becomes +Z
    assert_eq!(mesh.shading_normal(0), Vec3::Z);
    // Non-unit normals are normalized
    assert_eq!(mesh.shading_normal(1), Vec3::Y);
    // Missing entries (beyond the stream) become +Z as well
    assert_eq!(mesh.shading_normal(99), Vec3::Z);
}

#[test]
fn test_texcoord_defaults_to_zero() {
    let mesh = SourceMesh::from_polygons(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        vec![],
        vec![],
        &[vec![0, 1, 2]],
        None,
    );
    assert_eq!(mesh.texcoord(1), Vec2::ZERO);
}

#[test]
fn test_read_scene_missing_file_returns_none() {
    let scene = SourceScene::read_scene(std::path::Path::new("does/not/exist.obj"));
    assert!(scene.is_none());
}

#[test]
fn test_read_scene_parses_obj_with_polygon_faces() {
    let dir = std::env::temp_dir().join(format!("aurora_obj_test_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let obj_path = dir.join("quad.obj");
    {
        let mut file = std::fs::File::create(&obj_path).unwrap();
        writeln!(file, "v 0 0 0").unwrap();
        writeln!(file, "v 1 0 0").unwrap();
        writeln!(file, "v 1 1 0").unwrap();
        writeln!(file, "v 0 1 0").unwrap();
        writeln!(file, "vn 0 0 1").unwrap();
        writeln!(file, "f 1//1 2//1 3//1 4//1").unwrap();
    }

    let scene = SourceScene::read_scene(&obj_path).expect("quad.obj should parse");
    assert_eq!(scene.meshes.len(), 1);
    let mesh = &scene.meshes[0];
    assert_eq!(mesh.num_faces(), 1);
    // The quad face survives untriangulated
    assert_eq!(mesh.face(0).len(), 4);
    assert_eq!(mesh.num_vertices(), 4);

    std::fs::remove_dir_all(&dir).ok();
}
