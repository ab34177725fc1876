/// Unit tests for splitter.rs
///
/// Covers fan expansion, splitter idempotence for small meshes, the
/// oversized-mesh split, and both write paths.

use bytemuck::Zeroable;
use glam::{Vec2, Vec3};

use crate::import::{SourceMesh, SourceScene};
use crate::scene::CompactVertex;
use crate::settings::VertexIndex;

fn scene_of(mesh: SourceMesh) -> SourceScene {
    SourceScene {
        meshes: vec![mesh],
        materials: Vec::new(),
    }
}

fn grid_mesh(vertices_per_side: u32) -> SourceMesh {
    let mut positions = Vec::new();
    for y in 0..vertices_per_side {
        for x in 0..vertices_per_side {
            positions.push(Vec3::new(x as f32, y as f32, 0.0));
        }
    }
    let mut faces = Vec::new();
    for y in 0..vertices_per_side - 1 {
        for x in 0..vertices_per_side - 1 {
            let v0 = y * vertices_per_side + x;
            let v1 = v0 + 1;
            let v2 = v0 + vertices_per_side + 1;
            let v3 = v0 + vertices_per_side;
            faces.push(vec![v0, v1, v2, v3]);
        }
    }
    SourceMesh::from_polygons(positions, vec![], vec![], &faces, Some(0))
}

fn write_all(
    scene: &SourceScene,
    info: &crate::import::GeometryInfo,
) -> (Vec<Vec3>, Vec<CompactVertex>, Vec<VertexIndex>) {
    let mut positions = vec![Vec3::ZERO; info.dst_num_vertices];
    let mut packed = vec![CompactVertex::zeroed(); info.dst_num_vertices];
    let mut indices = vec![0 as VertexIndex; info.dst_num_indices];
    scene.write_geometry_info(&mut positions, &mut packed, &mut indices, info);
    (positions, packed, indices)
}

#[test]
fn test_small_mesh_is_not_split() {
    // A mesh that fits the limit returns one info without reordering
    let scene = scene_of(grid_mesh(8));
    let infos = scene.geometry_infos(VertexIndex::MAX as usize);
    assert_eq!(infos.len(), 1);
    assert!(!infos[0].is_indices_reorder_needed);
    assert_eq!(infos[0].dst_num_vertices, 64);
    // 49 quads, each expanding to 2 triangles
    assert_eq!(infos[0].dst_num_indices, 49 * 2 * 3);
    assert_eq!(infos[0].src_faces.len(), 49);
}

#[test]
fn test_fan_expansion_counts() {
    // One pentagon expands to 3 triangles
    let mesh = SourceMesh::from_polygons(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE],
        vec![],
        vec![],
        &[vec![0, 1, 2, 3, 4]],
        None,
    );
    let scene = scene_of(mesh);
    let infos = scene.geometry_infos(VertexIndex::MAX as usize);
    assert_eq!(infos[0].dst_num_indices, 9);

    let (_, _, indices) = write_all(&scene, &infos[0]);
    assert_eq!(indices, vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
}

#[test]
fn test_oversized_mesh_splits_and_keeps_totals() {
    // 300x300 grid = 90 000 vertices against a 16-bit index width
    let scene = scene_of(grid_mesh(300));
    let limit = VertexIndex::MAX as usize;
    let infos = scene.geometry_infos(limit);

    assert!(infos.len() >= 2);
    let total_indices: usize = infos.iter().map(|info| info.dst_num_indices).sum();
    // Every face survives the split: 299*299 quads * 2 triangles
    assert_eq!(total_indices, 299 * 299 * 2 * 3);
    for info in &infos {
        assert!(info.is_indices_reorder_needed);
        assert!(info.dst_num_vertices <= limit);
        assert!(info.dst_num_vertices > 0);
        assert!(info.dst_num_indices > 0);
    }

    // Face ranges tile the mesh contiguously
    let mut expected_begin = 0;
    for info in &infos {
        assert_eq!(info.src_faces.begin, expected_begin);
        expected_begin = info.src_faces.end;
    }
    assert_eq!(expected_begin, 299 * 299);
}

#[test]
fn test_split_geometries_have_indices_in_vertex_range() {
    let scene = scene_of(grid_mesh(300));
    let infos = scene.geometry_infos(VertexIndex::MAX as usize);

    for info in &infos {
        let (positions, _, indices) = write_all(&scene, info);
        assert_eq!(positions.len(), info.dst_num_vertices);
        for &index in &indices {
            assert!((index as usize) < info.dst_num_vertices);
        }
    }
}

#[test]
fn test_reordered_write_preserves_geometry() {
    // Force reordering with a tiny limit; the split pieces must carry the
    // same positions the source faces referenced
    let scene = scene_of(grid_mesh(4));
    let infos = scene.geometry_infos(8);
    assert!(infos.len() >= 2);

    let source_mesh = &scene.meshes[0];
    for info in &infos {
        let (positions, packed, indices) = write_all(&scene, info);
        for face_index in info.src_faces.iter() {
            let face = source_mesh.face(face_index);
            for &src_vindex in face {
                let src_position = source_mesh.positions[src_vindex as usize];
                assert!(
                    positions.contains(&src_position),
                    "source vertex {} missing from split piece",
                    src_vindex
                );
            }
        }
        // Degenerate source normals were replaced before packing
        for vertex in &packed {
            assert_eq!(vertex.snormal(), Vec3::Z);
        }
        assert!(!indices.is_empty());
    }
}

#[test]
fn test_simple_write_copies_vertices_at_same_indices() {
    let mesh = SourceMesh::from_polygons(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE],
        vec![Vec3::Z, Vec3::Z, Vec3::Z, Vec3::Z],
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
        ],
        &[vec![0, 1, 2], vec![1, 3, 2]],
        None,
    );
    let scene = scene_of(mesh);
    let infos = scene.geometry_infos(VertexIndex::MAX as usize);
    assert!(!infos[0].is_indices_reorder_needed);

    let (positions, packed, indices) = write_all(&scene, &infos[0]);
    assert_eq!(positions, scene.meshes[0].positions);
    assert_eq!(packed[3].texcoord(), Vec2::new(1.0, 1.0));
    assert_eq!(indices, vec![0, 1, 2, 1, 3, 2]);
}

#[test]
fn test_empty_meshes_are_skipped() {
    let mesh = SourceMesh::from_polygons(vec![Vec3::ZERO], vec![], vec![], &[], None);
    let scene = scene_of(mesh);
    assert!(scene.geometry_infos(VertexIndex::MAX as usize).is_empty());
}
