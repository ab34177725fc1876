//! Neutral records for imported scenes
//!
//! `read_scene` wraps the OBJ importer; everything downstream (splitting,
//! packing, material encoding) works on these records only, so synthetic
//! scenes can be built directly in tests.

use glam::{Vec2, Vec3};
use std::path::{Path, PathBuf};

/// One source material, with per-channel texture-or-constant inputs
#[derive(Debug, Clone, Default)]
pub struct SourceMaterial {
    pub name: String,
    pub diffuse_color: Option<Vec3>,
    pub specular_color: Option<Vec3>,
    /// Shininess, already normalized to [0, 1]; feeds the roughness channel
    pub shininess: Option<f32>,
    pub emission_color: Option<Vec3>,
    pub diffuse_texture: Option<PathBuf>,
    pub specular_texture: Option<PathBuf>,
    pub roughness_texture: Option<PathBuf>,
    pub emission_texture: Option<PathBuf>,
}

/// One source mesh: vertex streams plus polygon faces.
///
/// Faces are stored as one flat index stream with per-face offsets; a
/// face with n vertices is a triangle fan that expands to 3*(n-2)
/// destination indices.
#[derive(Debug, Clone)]
pub struct SourceMesh {
    pub positions: Vec<Vec3>,
    /// Empty when the source carries no normals
    pub normals: Vec<Vec3>,
    /// Empty when the source carries no texture coordinates
    pub texcoords: Vec<Vec2>,
    pub material_index: Option<u32>,
    indices: Vec<u32>,
    face_offsets: Vec<u32>,
}

impl SourceMesh {
    /// Build a mesh from explicit polygon faces (used by tests and
    /// procedural geometry).
    pub fn from_polygons(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        texcoords: Vec<Vec2>,
        faces: &[Vec<u32>],
        material_index: Option<u32>,
    ) -> Self {
        let mut indices = Vec::new();
        let mut face_offsets = Vec::with_capacity(faces.len() + 1);
        face_offsets.push(0);
        for face in faces {
            assert!(face.len() >= 3, "polygon face with {} vertices", face.len());
            indices.extend_from_slice(face);
            face_offsets.push(indices.len() as u32);
        }
        Self {
            positions,
            normals,
            texcoords,
            material_index,
            indices,
            face_offsets,
        }
    }

    fn from_flat_indices(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        texcoords: Vec<Vec2>,
        indices: Vec<u32>,
        face_arities: &[u32],
        material_index: Option<u32>,
    ) -> Self {
        let mut face_offsets = Vec::new();
        face_offsets.push(0u32);
        if face_arities.is_empty() {
            // Pure triangle stream
            debug_assert!(indices.len() % 3 == 0);
            for offset in (3..=indices.len() as u32).step_by(3) {
                face_offsets.push(offset);
            }
        } else {
            let mut offset = 0u32;
            for &arity in face_arities {
                offset += arity;
                face_offsets.push(offset);
            }
            debug_assert!(offset as usize == indices.len());
        }
        Self {
            positions,
            normals,
            texcoords,
            material_index,
            indices,
            face_offsets,
        }
    }

    /// Number of polygon faces
    pub fn num_faces(&self) -> u32 {
        (self.face_offsets.len() - 1) as u32
    }

    /// Source vertex indices of one polygon face
    pub fn face(&self, face_index: u32) -> &[u32] {
        let begin = self.face_offsets[face_index as usize] as usize;
        let end = self.face_offsets[face_index as usize + 1] as usize;
        &self.indices[begin..end]
    }

    /// Number of vertices in the vertex streams
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Shading normal for one source vertex.
    ///
    /// A missing or zero (degenerate) normal becomes +Z; everything else
    /// is normalized.
    pub fn shading_normal(&self, vertex_index: usize) -> Vec3 {
        let n = self
            .normals
            .get(vertex_index)
            .copied()
            .unwrap_or(Vec3::ZERO);
        if n.length_squared() == 0.0 {
            Vec3::Z
        } else {
            n.normalize()
        }
    }

    /// Texture coordinate for one source vertex, zero when absent
    pub fn texcoord(&self, vertex_index: usize) -> Vec2 {
        self.texcoords
            .get(vertex_index)
            .copied()
            .unwrap_or(Vec2::ZERO)
    }
}

/// An imported scene: meshes plus their materials
#[derive(Debug, Clone, Default)]
pub struct SourceScene {
    pub meshes: Vec<SourceMesh>,
    pub materials: Vec<SourceMaterial>,
}

impl SourceScene {
    /// Load a scene from an OBJ file.
    ///
    /// Returns `None` when the file cannot be read or parsed; the failure
    /// is logged and the caller decides how to proceed. Faces are kept as
    /// polygons so the fan expansion happens in one place downstream.
    pub fn read_scene(path: &Path) -> Option<SourceScene> {
        let load_options = tobj::LoadOptions {
            triangulate: false,
            single_index: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };

        let (models, materials_result) = match tobj::load_obj(path, &load_options) {
            Ok(loaded) => loaded,
            Err(e) => {
                crate::engine_warn!(
                    "aurora::SourceScene",
                    "Failed to read scene '{}': {}",
                    path.display(),
                    e
                );
                return None;
            }
        };

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let materials = match materials_result {
            Ok(source_materials) => source_materials
                .iter()
                .map(|m| convert_material(m, base_dir))
                .collect(),
            Err(e) => {
                crate::engine_warn!(
                    "aurora::SourceScene",
                    "Failed to read materials of '{}': {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        let meshes = models
            .into_iter()
            .map(|model| {
                let mesh = model.mesh;
                SourceMesh::from_flat_indices(
                    to_vec3s(&mesh.positions),
                    to_vec3s(&mesh.normals),
                    to_vec2s(&mesh.texcoords),
                    mesh.indices,
                    &mesh.face_arities,
                    mesh.material_id.map(|id| id as u32),
                )
            })
            .collect();

        Some(SourceScene { meshes, materials })
    }
}

fn to_vec3s(flat: &[f32]) -> Vec<Vec3> {
    flat.chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect()
}

fn to_vec2s(flat: &[f32]) -> Vec<Vec2> {
    flat.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])).collect()
}

fn convert_material(material: &tobj::Material, base_dir: &Path) -> SourceMaterial {
    let texture_path = |name: &Option<String>| -> Option<PathBuf> {
        name.as_ref().map(|n| base_dir.join(n))
    };

    SourceMaterial {
        name: material.name.clone(),
        diffuse_color: material.diffuse.map(Vec3::from_array),
        specular_color: material.specular.map(Vec3::from_array),
        // OBJ shininess is an exponent up to 1000
        shininess: material.shininess.map(|s| (s / 1000.0).clamp(0.0, 1.0)),
        emission_color: parse_emission(material),
        diffuse_texture: texture_path(&material.diffuse_texture),
        specular_texture: texture_path(&material.specular_texture),
        roughness_texture: texture_path(&material.shininess_texture),
        emission_texture: None,
    }
}

/// OBJ emission arrives as the `Ke` statement, which the importer keeps
/// as an unknown parameter.
fn parse_emission(material: &tobj::Material) -> Option<Vec3> {
    let ke = material.unknown_param.get("Ke")?;
    let components: Vec<f32> = ke
        .split_whitespace()
        .filter_map(|v| v.parse::<f32>().ok())
        .collect();
    if components.len() == 3 {
        Some(Vec3::new(components[0], components[1], components[2]))
    } else {
        None
    }
}

#[cfg(test)]
#[path = "source_scene_tests.rs"]
mod tests;
