//! Mesh splitting and destination-buffer writing
//!
//! Indices in the mega index buffer are 16-bit and relative to each
//! geometry's vertex base, so a source mesh whose vertex footprint exceeds
//! the index width is split into several geometries along its face
//! stream. `geometry_infos` plans the split; `write_geometry_info` fills
//! caller-provided destination spans for one planned geometry.

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::import::{SourceMesh, SourceScene};
use crate::scene::CompactVertex;
use crate::settings::VertexIndex;
use crate::utils::URange32;

/// Plan for one destination geometry produced from a source mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryInfo {
    /// Index of the source mesh in the scene
    pub src_mesh_index: u32,
    /// Half-open face range of the source mesh this geometry covers
    pub src_faces: URange32,
    /// Vertices the destination geometry will hold
    pub dst_num_vertices: usize,
    /// Indices the destination geometry will hold (fans expanded)
    pub dst_num_indices: usize,
    /// Source material of the mesh, if any
    pub src_material_index: Option<u32>,
    /// Whether a fresh src-to-dst vertex mapping must be built on write
    pub is_indices_reorder_needed: bool,
}

impl SourceScene {
    /// Enumerate destination geometries for every mesh in the scene,
    /// splitting meshes whose vertex footprint exceeds
    /// `max_dst_num_vertices_per_geometry`.
    pub fn geometry_infos(
        &self,
        max_dst_num_vertices_per_geometry: usize,
    ) -> Vec<GeometryInfo> {
        let mut result = Vec::new();
        for mesh_index in 0..self.meshes.len() {
            self.mesh_geometry_infos(
                &mut result,
                mesh_index as u32,
                max_dst_num_vertices_per_geometry,
            );
        }
        result
    }

    fn mesh_geometry_infos(
        &self,
        geometries: &mut Vec<GeometryInfo>,
        src_mesh_index: u32,
        max_dst_num_vertices_per_geometry: usize,
    ) {
        let mesh = &self.meshes[src_mesh_index as usize];
        let num_faces = mesh.num_faces();
        if num_faces == 0 {
            crate::engine_warn!(
                "aurora::Splitter",
                "Source mesh {} has no faces, skipped",
                src_mesh_index
            );
            return;
        }

        // One scan over all faces: destination index count (fans expand to
        // 3*(n-2) indices) and the min/max referenced vertex index.
        {
            let mut max_vindex = u32::MIN;
            let mut min_vindex = u32::MAX;
            let mut num_dst_indices = 0usize;
            for face_index in 0..num_faces {
                let face = mesh.face(face_index);
                num_dst_indices += (face.len() - 2) * 3;
                for &vindex in face {
                    max_vindex = max_vindex.max(vindex);
                    min_vindex = min_vindex.min(vindex);
                }
            }

            let num_vindices = (max_vindex - min_vindex + 1) as usize;
            if num_vindices < max_dst_num_vertices_per_geometry {
                geometries.push(GeometryInfo {
                    src_mesh_index,
                    src_faces: URange32::new(0, num_faces),
                    dst_num_vertices: num_vindices,
                    dst_num_indices: num_dst_indices,
                    src_material_index: mesh.material_index,
                    is_indices_reorder_needed: false,
                });
                return;
            }
        }

        // The mesh does not fit the index width. Walk faces in order,
        // tracking the set of referenced source vertices; when adding the
        // next face would push the set past the limit, close the current
        // range and start a new one at that face.
        let mut used_src_vindices: FxHashSet<u32> = FxHashSet::default();
        let mut used_num_indices = 0usize;
        let mut range_begin = 0u32;

        let mut face_index = 0u32;
        while face_index < num_faces {
            let num_indices_before = used_num_indices;
            let num_vertices_before = used_src_vindices.len();

            let face = mesh.face(face_index);
            used_num_indices += (face.len() - 2) * 3;
            for &vindex in face {
                used_src_vindices.insert(vindex);
            }

            if used_src_vindices.len() >= max_dst_num_vertices_per_geometry {
                assert!(
                    face_index > range_begin,
                    "source mesh {} face {} alone references more vertices than the index \
                     width can address",
                    src_mesh_index,
                    face_index
                );
                geometries.push(GeometryInfo {
                    src_mesh_index,
                    src_faces: URange32::new(range_begin, face_index),
                    dst_num_vertices: num_vertices_before,
                    dst_num_indices: num_indices_before,
                    src_material_index: mesh.material_index,
                    is_indices_reorder_needed: true,
                });

                // Reprocess the face that overflowed into a fresh range
                range_begin = face_index;
                used_num_indices = 0;
                used_src_vindices.clear();
            } else {
                face_index += 1;
            }
        }

        // Close the trailing range
        assert!(
            !used_src_vindices.is_empty() && used_num_indices > 0,
            "source mesh {} split produced an empty trailing geometry",
            src_mesh_index
        );
        geometries.push(GeometryInfo {
            src_mesh_index,
            src_faces: URange32::new(range_begin, num_faces),
            dst_num_vertices: used_src_vindices.len(),
            dst_num_indices: used_num_indices,
            src_material_index: mesh.material_index,
            is_indices_reorder_needed: true,
        });
    }

    /// Fill destination spans for one planned geometry.
    ///
    /// The spans must be sized exactly to the info's destination counts.
    pub fn write_geometry_info(
        &self,
        positions: &mut [Vec3],
        compact_vertices: &mut [CompactVertex],
        indices: &mut [VertexIndex],
        geometry_info: &GeometryInfo,
    ) {
        assert_eq!(positions.len(), geometry_info.dst_num_vertices);
        assert_eq!(compact_vertices.len(), geometry_info.dst_num_vertices);
        assert_eq!(indices.len(), geometry_info.dst_num_indices);

        let mesh = &self.meshes[geometry_info.src_mesh_index as usize];
        if geometry_info.is_indices_reorder_needed {
            write_reordered(mesh, positions, compact_vertices, indices, geometry_info);
        } else {
            write_simple(mesh, positions, compact_vertices, indices);
        }
    }
}

/// Write one destination vertex from a source vertex
fn write_vertex(
    mesh: &SourceMesh,
    src_vindex: usize,
    dst_vindex: usize,
    positions: &mut [Vec3],
    compact_vertices: &mut [CompactVertex],
) {
    positions[dst_vindex] = mesh.positions[src_vindex];
    compact_vertices[dst_vindex].set_snormal(mesh.shading_normal(src_vindex));
    compact_vertices[dst_vindex].set_texcoord(mesh.texcoord(src_vindex));
}

/// Vertices keep their source indices; only the index stream is rewritten
/// (triangle fans to triangle lists).
fn write_simple(
    mesh: &SourceMesh,
    positions: &mut [Vec3],
    compact_vertices: &mut [CompactVertex],
    indices: &mut [VertexIndex],
) {
    assert_eq!(
        mesh.num_vertices(),
        positions.len(),
        "non-split geometry must cover the whole source vertex stream"
    );

    for src_vindex in 0..mesh.num_vertices() {
        write_vertex(mesh, src_vindex, src_vindex, positions, compact_vertices);
    }

    let mut offset = 0usize;
    for face_index in 0..mesh.num_faces() {
        let face = mesh.face(face_index);
        let index0 = face[0];
        for fan in 0..face.len() - 2 {
            let index1 = face[fan + 1];
            let index2 = face[fan + 2];
            assert!(index0 < VertexIndex::MAX as u32);
            assert!(index1 < VertexIndex::MAX as u32);
            assert!(index2 < VertexIndex::MAX as u32);
            indices[offset] = index0 as VertexIndex;
            indices[offset + 1] = index1 as VertexIndex;
            indices[offset + 2] = index2 as VertexIndex;
            offset += 3;
        }
    }
}

/// A fresh src-to-dst vertex mapping is built lazily: the first touch of a
/// source vertex assigns the next free destination index and writes the
/// vertex streams; later touches reuse it.
fn write_reordered(
    mesh: &SourceMesh,
    positions: &mut [Vec3],
    compact_vertices: &mut [CompactVertex],
    indices: &mut [VertexIndex],
    geometry_info: &GeometryInfo,
) {
    let mut dst_vindex_from_src: FxHashMap<u32, u32> = FxHashMap::default();

    let mut dst_vindex_for = |src_vindex: u32,
                              positions: &mut [Vec3],
                              compact_vertices: &mut [CompactVertex]|
     -> u32 {
        if let Some(&dst_vindex) = dst_vindex_from_src.get(&src_vindex) {
            return dst_vindex;
        }
        let dst_vindex = dst_vindex_from_src.len() as u32;
        write_vertex(
            mesh,
            src_vindex as usize,
            dst_vindex as usize,
            positions,
            compact_vertices,
        );
        dst_vindex_from_src.insert(src_vindex, dst_vindex);
        dst_vindex
    };

    let mut num_dst_indices = 0usize;
    for face_index in geometry_info.src_faces.iter() {
        let face = mesh.face(face_index);
        let dst_vindex0 = dst_vindex_for(face[0], positions, compact_vertices);
        let mut dst_vindex1 = dst_vindex_for(face[1], positions, compact_vertices);
        for fan in 2..face.len() {
            let dst_vindex2 = dst_vindex_for(face[fan], positions, compact_vertices);

            assert!(dst_vindex0 < VertexIndex::MAX as u32);
            assert!(dst_vindex1 < VertexIndex::MAX as u32);
            assert!(dst_vindex2 < VertexIndex::MAX as u32);
            indices[num_dst_indices] = dst_vindex0 as VertexIndex;
            indices[num_dst_indices + 1] = dst_vindex1 as VertexIndex;
            indices[num_dst_indices + 2] = dst_vindex2 as VertexIndex;
            num_dst_indices += 3;

            dst_vindex1 = dst_vindex2;
        }
    }

    assert_eq!(dst_vindex_from_src.len(), geometry_info.dst_num_vertices);
    assert_eq!(num_dst_indices, geometry_info.dst_num_indices);
}

#[cfg(test)]
#[path = "splitter_tests.rs"]
mod tests;
