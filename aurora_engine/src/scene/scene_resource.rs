//! Scene resource - owner of every scene-level GPU resource
//!
//! All imported meshes are packed into shared mega-buffers (positions,
//! packed vertex attributes, 16-bit indices); geometries carry offsets
//! into them, never buffers of their own. `commit` turns the accumulated
//! geometries, base instances, and an instance list into a BLAS per base
//! instance, one TLAS, and the two bindless indirection tables.
//!
//! Ownership is exclusive: the scene resource owns the mega-buffers, the
//! texture list, the material/emission buffers, the table buffers, the
//! BLAS list and the TLAS. Passes borrow through the render context.

use bytemuck::Zeroable;
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::graphics_device::{
    transform_to_rows_3x4, AccelBuildHint, Blas, BlasGeometryDesc, Buffer, BufferDesc,
    BufferFormat, BufferUsage, CommandPool, Device, IndexType, MemoryResidency, QueueType,
    Texture, TextureDesc, TextureFormat, TextureState, TextureUsage, Tlas,
};
use crate::import::{SourceMaterial, SourceScene};
use crate::lighting::{build_top_level_cdf, EmissionSource, Envmap, EmitterCdf, NON_EMITTER_SENTINEL};
use crate::scene::{
    decode_rgb, encode_r, encode_rgb, BaseInstanceTableEntry, CompactVertex, GeometryTableEntry,
    StandardEmission, StandardMaterial,
};
use crate::settings::{
    round_up, BufferSize, VertexIndex, GEOMETRY_BASE_ALIGNMENT, MAX_NUM_BASE_INSTANCE_TABLE_ENTRIES,
    MAX_NUM_BINDLESS_TEXTURES, MAX_NUM_GEOMETRY_TABLE_ENTRIES, MAX_NUM_INDICES,
    MAX_NUM_STANDARD_EMISSIONS, MAX_NUM_STANDARD_MATERIALS, MAX_NUM_VERTICES,
};
use crate::utils::URange32;
use crate::{engine_asset_err, engine_bail};

const SOURCE: &str = "aurora::SceneResource";

const POSITION_STRIDE: u64 = std::mem::size_of::<Vec3>() as u64;
const PACKED_STRIDE: u64 = std::mem::size_of::<CompactVertex>() as u64;
const INDEX_STRIDE: u64 = std::mem::size_of::<VertexIndex>() as u64;

/// One packed geometry: offsets into the mega-buffers plus material and
/// emission rows. Mirrored row-for-row into the GPU geometry table at
/// commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneGeometry {
    pub vbuf_base_index: BufferSize,
    pub ibuf_base_index: BufferSize,
    pub num_vertices: BufferSize,
    pub num_indices: BufferSize,
    pub material_index: BufferSize,
    /// 0 = the reserved black emission; such geometries never emit
    pub emission_index: BufferSize,
    pub is_updatable: bool,
}

/// A set of geometry-id ranges sharing one BLAS
#[derive(Debug, Clone, Default)]
pub struct SceneBaseInstance {
    pub geometry_id_ranges: Vec<URange32>,
}

/// One world-space instance of a base instance
#[derive(Debug, Clone, Copy)]
pub struct SceneInstance {
    pub base_instance_id: u32,
    pub hit_group_id: u32,
    pub transform: Mat4,
}

/// The instance list a frontend commits
#[derive(Debug, Clone, Default)]
pub struct SceneDesc {
    pub instances: Vec<SceneInstance>,
}

pub struct SceneResource {
    transfer_command_pool: Box<dyn CommandPool>,

    // Mega-buffers; bump-allocated, written only through staging copies
    d_vbuf_position: Box<dyn Buffer>,
    d_vbuf_packed: Box<dyn Buffer>,
    d_ibuf: Box<dyn Buffer>,
    num_vertices_filled: usize,
    num_indices_filled: usize,

    // Bindless texture pool; index 0 is the opaque black 1x1 fallback
    d_textures: Vec<Box<dyn Texture>>,
    texture_index_from_path: FxHashMap<PathBuf, u32>,

    // Materials and emissions; row 0 of each is the reserved black
    d_materials: Box<dyn Buffer>,
    h_materials: Vec<StandardMaterial>,
    d_emissions: Box<dyn Buffer>,
    h_emissions: Vec<StandardEmission>,

    // Bindless indirection tables; host mirrors kept after commit
    d_base_instance_table: Box<dyn Buffer>,
    d_geometry_table: Box<dyn Buffer>,
    h_base_instance_table: Vec<BaseInstanceTableEntry>,
    h_geometry_table: Vec<GeometryTableEntry>,

    geometries: Vec<SceneGeometry>,
    base_instances: Vec<SceneBaseInstance>,

    // Emitter sampling structure; parallel to `geometries`
    emitter_cdfs: Vec<Option<EmitterCdf>>,
    d_emitter_cdfs: Vec<Option<Box<dyn Buffer>>>,
    d_non_emitter_cdf: Box<dyn Buffer>,
    h_top_level_cdf: Vec<f32>,
    d_top_level_cdf: Option<Box<dyn Buffer>>,

    envmap: Envmap,
    d_envmap_texture: Box<dyn Texture>,
    d_envmap_cdf: Box<dyn Buffer>,

    rt_blases: Vec<Box<dyn Blas>>,
    rt_tlas: Option<Box<dyn Tlas>>,
}

impl SceneResource {
    pub fn new(device: &mut dyn Device) -> Result<Self> {
        let mut transfer_command_pool =
            device.create_command_pool("scene_resource_transfer_command_pool", QueueType::Transfer)?;

        let d_vbuf_position = device.create_buffer(BufferDesc {
            name: "scene_vbuf_position".to_string(),
            size: POSITION_STRIDE * MAX_NUM_VERTICES as u64,
            usage: BufferUsage::TRANSFER_DST
                | BufferUsage::STORAGE
                | BufferUsage::VERTEX
                | BufferUsage::ACCEL_STRUCT_INPUT,
            residency: MemoryResidency::GpuOnly,
        })?;
        let d_vbuf_packed = device.create_buffer(BufferDesc {
            name: "scene_vbuf_packed".to_string(),
            size: PACKED_STRIDE * MAX_NUM_VERTICES as u64,
            usage: BufferUsage::TRANSFER_DST | BufferUsage::STORAGE | BufferUsage::VERTEX,
            residency: MemoryResidency::GpuOnly,
        })?;
        let d_ibuf = device.create_buffer(BufferDesc {
            name: "scene_ibuf".to_string(),
            size: INDEX_STRIDE * MAX_NUM_INDICES as u64,
            usage: BufferUsage::TRANSFER_DST
                | BufferUsage::STORAGE
                | BufferUsage::INDEX
                | BufferUsage::ACCEL_STRUCT_INPUT,
            residency: MemoryResidency::GpuOnly,
        })?;

        let d_materials = device.create_buffer(BufferDesc {
            name: "scene_materials".to_string(),
            size: (std::mem::size_of::<StandardMaterial>() * MAX_NUM_STANDARD_MATERIALS) as u64,
            usage: BufferUsage::TRANSFER_DST | BufferUsage::STORAGE,
            residency: MemoryResidency::GpuOnly,
        })?;
        let d_emissions = device.create_buffer(BufferDesc {
            name: "scene_emissions".to_string(),
            size: (std::mem::size_of::<StandardEmission>() * MAX_NUM_STANDARD_EMISSIONS) as u64,
            usage: BufferUsage::TRANSFER_DST | BufferUsage::STORAGE,
            residency: MemoryResidency::GpuOnly,
        })?;

        let d_base_instance_table = device.create_buffer(BufferDesc {
            name: "scene_base_instance_table".to_string(),
            size: (std::mem::size_of::<BaseInstanceTableEntry>()
                * MAX_NUM_BASE_INSTANCE_TABLE_ENTRIES) as u64,
            usage: BufferUsage::TRANSFER_DST | BufferUsage::STORAGE,
            residency: MemoryResidency::GpuOnly,
        })?;
        let d_geometry_table = device.create_buffer(BufferDesc {
            name: "scene_geometry_table".to_string(),
            size: (std::mem::size_of::<GeometryTableEntry>() * MAX_NUM_GEOMETRY_TABLE_ENTRIES)
                as u64,
            usage: BufferUsage::TRANSFER_DST | BufferUsage::STORAGE,
            residency: MemoryResidency::GpuOnly,
        })?;

        let d_non_emitter_cdf = create_storage_buffer_with_data(
            device,
            transfer_command_pool.as_mut(),
            "scene_non_emitter_cdf",
            bytemuck::cast_slice(&[NON_EMITTER_SENTINEL]),
        )?;

        let envmap = Envmap::blank();
        let d_envmap_texture = upload_envmap_texture(
            device,
            transfer_command_pool.as_mut(),
            "scene_envmap",
            &envmap,
        )?;
        let d_envmap_cdf = create_storage_buffer_with_data(
            device,
            transfer_command_pool.as_mut(),
            "scene_envmap_cdf",
            bytemuck::cast_slice(envmap.cdf()),
        )?;

        let mut scene_resource = Self {
            transfer_command_pool,
            d_vbuf_position,
            d_vbuf_packed,
            d_ibuf,
            num_vertices_filled: 0,
            num_indices_filled: 0,
            d_textures: Vec::new(),
            texture_index_from_path: FxHashMap::default(),
            d_materials,
            h_materials: vec![StandardMaterial::black()],
            d_emissions,
            h_emissions: vec![StandardEmission::black()],
            d_base_instance_table,
            d_geometry_table,
            h_base_instance_table: Vec::new(),
            h_geometry_table: Vec::new(),
            geometries: Vec::new(),
            base_instances: Vec::new(),
            emitter_cdfs: Vec::new(),
            d_emitter_cdfs: Vec::new(),
            d_non_emitter_cdf,
            h_top_level_cdf: Vec::new(),
            d_top_level_cdf: None,
            envmap,
            d_envmap_texture,
            d_envmap_cdf,
            rt_blases: Vec::new(),
            rt_tlas: None,
        };

        // Bindless slot 0: opaque black 1x1 fallback
        let fallback_index =
            scene_resource.add_texture_pixels(device, "scene_fallback_black", 1, 1, 4, &[0, 0, 0, 255])?;
        debug_assert_eq!(fallback_index, 0);

        Ok(scene_resource)
    }

    // ===== GEOMETRY BUILD =====

    /// Read a mesh file and append its geometries to the mega-buffers.
    ///
    /// Returns the half-open range of geometry ids produced.
    pub fn add_geometries(&mut self, device: &mut dyn Device, path: &Path) -> Result<URange32> {
        let scene = SourceScene::read_scene(path).ok_or_else(|| {
            engine_asset_err!(SOURCE, "Failed to read scene '{}'", path.display())
        })?;
        crate::engine_info!(
            SOURCE,
            "Read scene '{}': {} meshes, {} materials",
            path.display(),
            scene.meshes.len(),
            scene.materials.len()
        );
        self.add_source_scene(device, &scene)
    }

    /// Append every geometry of an imported scene.
    ///
    /// Bump-allocates from the current fill marks; all geometry bases are
    /// aligned to [`GEOMETRY_BASE_ALIGNMENT`] elements so relative 16-bit
    /// indexing never crosses an unaligned boundary.
    pub fn add_source_scene(
        &mut self,
        device: &mut dyn Device,
        scene: &SourceScene,
    ) -> Result<URange32> {
        // Load all materials (and the textures they reference)
        let material_offset = self.h_materials.len();
        let emission_offset = self.h_emissions.len();
        for source_material in &scene.materials {
            let material = self.build_standard_material(device, source_material)?;
            let emission = self.build_standard_emission(device, source_material)?;
            if self.h_materials.len() >= MAX_NUM_STANDARD_MATERIALS {
                panic!("exceeded MAX_NUM_STANDARD_MATERIALS ({})", MAX_NUM_STANDARD_MATERIALS);
            }
            if self.h_emissions.len() >= MAX_NUM_STANDARD_EMISSIONS {
                panic!("exceeded MAX_NUM_STANDARD_EMISSIONS ({})", MAX_NUM_STANDARD_EMISSIONS);
            }
            self.h_materials.push(material);
            self.h_emissions.push(emission);
        }

        let geometry_infos = scene.geometry_infos(VertexIndex::MAX as usize);

        // Plan per-geometry base indices: prefix sums of the aligned counts
        let mut vertex_base_indices = Vec::with_capacity(geometry_infos.len());
        let mut index_base_indices = Vec::with_capacity(geometry_infos.len());
        let mut num_total_vertices = 0usize;
        let mut num_total_indices = 0usize;
        for info in &geometry_infos {
            vertex_base_indices.push(num_total_vertices);
            index_base_indices.push(num_total_indices);
            num_total_vertices += round_up(info.dst_num_vertices, GEOMETRY_BASE_ALIGNMENT);
            num_total_indices += round_up(info.dst_num_indices, GEOMETRY_BASE_ALIGNMENT);
        }

        if self.num_vertices_filled + num_total_vertices > MAX_NUM_VERTICES {
            panic!(
                "exceeded MAX_NUM_VERTICES ({}): {} filled + {} incoming",
                MAX_NUM_VERTICES, self.num_vertices_filled, num_total_vertices
            );
        }
        if self.num_indices_filled + num_total_indices > MAX_NUM_INDICES {
            panic!(
                "exceeded MAX_NUM_INDICES ({}): {} filled + {} incoming",
                MAX_NUM_INDICES, self.num_indices_filled, num_total_indices
            );
        }
        if self.geometries.len() + geometry_infos.len() > MAX_NUM_GEOMETRY_TABLE_ENTRIES {
            panic!(
                "exceeded MAX_NUM_GEOMETRY_TABLE_ENTRIES ({})",
                MAX_NUM_GEOMETRY_TABLE_ENTRIES
            );
        }

        // Write every geometry into contiguous host buffers
        let mut h_positions = vec![Vec3::ZERO; num_total_vertices];
        let mut h_packed = vec![CompactVertex::zeroed(); num_total_vertices];
        let mut h_indices = vec![0 as VertexIndex; num_total_indices];

        let geometries_range = URange32::new(
            self.geometries.len() as u32,
            (self.geometries.len() + geometry_infos.len()) as u32,
        );

        for (i, info) in geometry_infos.iter().enumerate() {
            let vertex_base = vertex_base_indices[i];
            let index_base = index_base_indices[i];

            let positions = &mut h_positions[vertex_base..vertex_base + info.dst_num_vertices];
            let packed = &mut h_packed[vertex_base..vertex_base + info.dst_num_vertices];
            let indices = &mut h_indices[index_base..index_base + info.dst_num_indices];
            scene.write_geometry_info(positions, packed, indices, info);

            debug_assert!(
                indices.iter().all(|&idx| (idx as usize) < info.dst_num_vertices),
                "geometry {} has an index out of its vertex range",
                i
            );

            assert!(info.dst_num_vertices < BufferSize::MAX as usize);
            assert!(info.dst_num_indices < BufferSize::MAX as usize);

            let material_index = match info.src_material_index {
                Some(src) => (material_offset + src as usize) as BufferSize,
                None => 0,
            };

            // A geometry only emits if its emission encodes non-zero
            // intensity (texture-backed emissions are assumed non-zero)
            let emission_index = match info.src_material_index {
                Some(src) => {
                    let emission = &self.h_emissions[emission_offset + src as usize];
                    if emission.is_non_zero() {
                        (emission_offset + src as usize) as BufferSize
                    } else {
                        0
                    }
                }
                None => 0,
            };

            let geometry = SceneGeometry {
                vbuf_base_index: (vertex_base + self.num_vertices_filled) as BufferSize,
                ibuf_base_index: (index_base + self.num_indices_filled) as BufferSize,
                num_vertices: info.dst_num_vertices as BufferSize,
                num_indices: info.dst_num_indices as BufferSize,
                material_index,
                emission_index,
                is_updatable: true,
            };

            // Emitter CDF while the host vertex data is still around
            let (emitter_cdf, d_emitter_cdf) = if emission_index != 0 {
                let emission = &self.h_emissions[emission_index as usize];
                let emission_source = if emission.is_emission_texture() {
                    EmissionSource::Texture
                } else {
                    EmissionSource::Constant(decode_rgb(emission.emission_field))
                };
                let positions = &h_positions[vertex_base..vertex_base + info.dst_num_vertices];
                let indices = &h_indices[index_base..index_base + info.dst_num_indices];
                let cdf = EmitterCdf::from_triangles(positions, indices, emission_source);
                let buffer = create_storage_buffer_with_data(
                    device,
                    self.transfer_command_pool.as_mut(),
                    &format!("scene_emitter_cdf_{}", geometries_range.begin as usize + i),
                    bytemuck::cast_slice(cdf.cdf()),
                )?;
                (Some(cdf), Some(buffer))
            } else {
                (None, None)
            };

            self.geometries.push(geometry);
            self.emitter_cdfs.push(emitter_cdf);
            self.d_emitter_cdfs.push(d_emitter_cdf);
        }

        // Stage the packed host buffers into the mega-buffers at the
        // current fill marks, then wait so any following AS build sees
        // the data.
        let mut command_list = self.transfer_command_pool.get_command_list()?;
        let staging_positions = create_staging_buffer(
            device,
            "scene_staging_vbuf_position",
            bytemuck::cast_slice(&h_positions),
        )?;
        let staging_packed = create_staging_buffer(
            device,
            "scene_staging_vbuf_packed",
            bytemuck::cast_slice(&h_packed),
        )?;
        let staging_indices = create_staging_buffer(
            device,
            "scene_staging_ibuf",
            bytemuck::cast_slice(&h_indices),
        )?;

        command_list.begin()?;
        command_list.copy_buffer_to_buffer(
            self.d_vbuf_position.as_ref(),
            self.num_vertices_filled as u64 * POSITION_STRIDE,
            staging_positions.as_ref(),
            0,
            staging_positions.size(),
        )?;
        command_list.copy_buffer_to_buffer(
            self.d_vbuf_packed.as_ref(),
            self.num_vertices_filled as u64 * PACKED_STRIDE,
            staging_packed.as_ref(),
            0,
            staging_packed.size(),
        )?;
        command_list.copy_buffer_to_buffer(
            self.d_ibuf.as_ref(),
            self.num_indices_filled as u64 * INDEX_STRIDE,
            staging_indices.as_ref(),
            0,
            staging_indices.size(),
        )?;
        command_list.end()?;
        submit_and_wait(device, command_list.as_mut(), "scene_geometry_upload_fence")?;

        self.num_vertices_filled += num_total_vertices;
        self.num_indices_filled += num_total_indices;

        crate::engine_info!(
            SOURCE,
            "Packed {} geometries ({} vertices, {} indices); mega-buffers at {}/{} vertices, {}/{} indices",
            geometry_infos.len(),
            num_total_vertices,
            num_total_indices,
            self.num_vertices_filled,
            MAX_NUM_VERTICES,
            self.num_indices_filled,
            MAX_NUM_INDICES
        );

        Ok(geometries_range)
    }

    /// Group geometry ranges into a base instance sharing one BLAS;
    /// returns the base-instance id.
    pub fn add_base_instance(&mut self, geometry_ranges: &[URange32]) -> usize {
        if self.base_instances.len() >= MAX_NUM_BASE_INSTANCE_TABLE_ENTRIES {
            panic!(
                "exceeded MAX_NUM_BASE_INSTANCE_TABLE_ENTRIES ({})",
                MAX_NUM_BASE_INSTANCE_TABLE_ENTRIES
            );
        }
        self.base_instances.push(SceneBaseInstance {
            geometry_id_ranges: geometry_ranges.to_vec(),
        });
        self.base_instances.len() - 1
    }

    // ===== MATERIALS / TEXTURES =====

    fn build_standard_material(
        &mut self,
        device: &mut dyn Device,
        source: &SourceMaterial,
    ) -> Result<StandardMaterial> {
        let mut material = StandardMaterial::black();

        if let Some(path) = &source.diffuse_texture {
            material.diffuse_field = self.add_texture(device, path, 4)?;
        } else if let Some(color) = source.diffuse_color {
            material.diffuse_field = encode_rgb(color);
        }

        if let Some(path) = &source.specular_texture {
            material.specular_field = self.add_texture(device, path, 4)?;
        } else if let Some(color) = source.specular_color {
            material.specular_field = encode_rgb(color);
        }

        if let Some(path) = &source.roughness_texture {
            material.roughness_field = self.add_texture(device, path, 1)?;
        } else if let Some(shininess) = source.shininess {
            material.roughness_field = encode_r(shininess);
        }

        Ok(material)
    }

    fn build_standard_emission(
        &mut self,
        device: &mut dyn Device,
        source: &SourceMaterial,
    ) -> Result<StandardEmission> {
        let mut emission = StandardEmission::black();
        if let Some(path) = &source.emission_texture {
            emission.emission_field = self.add_texture(device, path, 4)?;
        } else if let Some(color) = source.emission_color {
            emission.emission_field = encode_rgb(color);
        }
        Ok(emission)
    }

    /// Decode an image file into a bindless texture slot, deduplicated by
    /// absolute source path. Returns the texture index.
    pub fn add_texture(
        &mut self,
        device: &mut dyn Device,
        path: &Path,
        desired_channels: usize,
    ) -> Result<u32> {
        if let Some(&texture_index) = self.texture_index_from_path.get(path) {
            return Ok(texture_index);
        }

        let decoded = image::open(path).map_err(|e| {
            engine_asset_err!(SOURCE, "Failed to decode texture '{}': {}", path.display(), e)
        })?;
        let decoded = decoded.flipv();

        assert!(desired_channels == 4 || desired_channels == 1);
        let (width, height, pixel_bytes) = if desired_channels == 4 {
            let rgba = decoded.to_rgba8();
            (rgba.width(), rgba.height(), rgba.into_raw())
        } else {
            let gray = decoded.to_luma8();
            (gray.width(), gray.height(), gray.into_raw())
        };

        let texture_index = self.add_texture_pixels(
            device,
            &path.display().to_string(),
            width,
            height,
            desired_channels,
            &pixel_bytes,
        )?;
        self.texture_index_from_path
            .insert(path.to_path_buf(), texture_index);

        crate::engine_info!(
            SOURCE,
            "Loaded texture '{}' ({}x{}, {} channels) into bindless slot {}",
            path.display(),
            width,
            height,
            desired_channels,
            texture_index
        );
        Ok(texture_index)
    }

    /// Upload raw 1-byte-per-channel pixels into the next bindless slot.
    ///
    /// 4-channel data lands in an SRGB format, 1-channel in linear. Rows
    /// are copied one by one into the staging buffer so the row pitch can
    /// honor the device alignment.
    fn add_texture_pixels(
        &mut self,
        device: &mut dyn Device,
        name: &str,
        width: u32,
        height: u32,
        desired_channels: usize,
        pixel_bytes: &[u8],
    ) -> Result<u32> {
        if self.d_textures.len() >= MAX_NUM_BINDLESS_TEXTURES {
            panic!("exceeded MAX_NUM_BINDLESS_TEXTURES ({})", MAX_NUM_BINDLESS_TEXTURES);
        }

        let format = if desired_channels == 4 {
            TextureFormat::R8G8B8A8_UNORM_SRGB
        } else {
            TextureFormat::R8_UNORM
        };

        let texture = device.create_texture(TextureDesc {
            name: name.to_string(),
            width,
            height,
            format,
            usage: TextureUsage::TRANSFER_DST | TextureUsage::SAMPLED,
            initial_state: TextureState::TransferDst,
        })?;

        let row_bytes = width as u64 * format.size_bytes_per_pixel() as u64;
        let aligned_row_bytes = row_bytes.div_ceil(device.data_pitch_alignment())
            * device.data_pitch_alignment();

        let staging = device.create_buffer(BufferDesc {
            name: format!("{}_staging", name),
            size: aligned_row_bytes * height as u64,
            usage: BufferUsage::TRANSFER_SRC,
            residency: MemoryResidency::CpuOnly,
        })?;
        for row in 0..height as u64 {
            let src_begin = (row * row_bytes) as usize;
            let src_end = src_begin + row_bytes as usize;
            staging.update(row * aligned_row_bytes, &pixel_bytes[src_begin..src_end])?;
        }

        let mut command_list = self.transfer_command_pool.get_command_list()?;
        command_list.begin()?;
        command_list.copy_buffer_to_texture(texture.as_ref(), staging.as_ref(), 0, aligned_row_bytes)?;
        command_list.transition_texture(
            texture.as_ref(),
            TextureState::TransferDst,
            TextureState::ShaderReadOnly,
        )?;
        command_list.end()?;
        submit_and_wait(device, command_list.as_mut(), "scene_texture_upload_fence")?;

        self.d_textures.push(texture);
        Ok((self.d_textures.len() - 1) as u32)
    }

    /// Replace the environment map from an image file
    pub fn set_envmap(&mut self, device: &mut dyn Device, path: &Path) -> Result<()> {
        let envmap = Envmap::from_path(path)?;
        self.d_envmap_texture = upload_envmap_texture(
            device,
            self.transfer_command_pool.as_mut(),
            "scene_envmap",
            &envmap,
        )?;
        self.d_envmap_cdf = create_storage_buffer_with_data(
            device,
            self.transfer_command_pool.as_mut(),
            "scene_envmap_cdf",
            bytemuck::cast_slice(envmap.cdf()),
        )?;
        self.envmap = envmap;
        Ok(())
    }

    // ===== COMMIT =====

    /// Build the acceleration structures and upload materials and tables
    /// for an instance list.
    ///
    /// BLASes are built serially, one per base instance; the TLAS waits
    /// for all of them. The transfer fence is waited before returning, so
    /// the first frame after commit reads complete data.
    pub fn commit(&mut self, device: &mut dyn Device, scene_desc: &SceneDesc) -> Result<()> {
        for instance in &scene_desc.instances {
            if instance.base_instance_id as usize >= self.base_instances.len() {
                engine_bail!(
                    SOURCE,
                    "Scene instance references base instance {} but only {} exist",
                    instance.base_instance_id,
                    self.base_instances.len()
                );
            }
        }

        self.build_blases(device)?;
        self.build_tlas(device, scene_desc)?;

        // Host tables: one base-instance row per base instance, then one
        // geometry row per geometry of its ranges, in order. Entry 0 is
        // guaranteed {0} because the geometry table starts empty.
        self.h_base_instance_table.clear();
        self.h_geometry_table.clear();
        for base_instance in &self.base_instances {
            assert!(self.h_geometry_table.len() < u16::MAX as usize);
            self.h_base_instance_table.push(BaseInstanceTableEntry {
                geometry_table_index_base: self.h_geometry_table.len() as u16,
            });
            for range in &base_instance.geometry_id_ranges {
                for geometry_id in range.iter() {
                    let geometry = &self.geometries[geometry_id as usize];
                    self.h_geometry_table.push(GeometryTableEntry {
                        vertex_base_index: geometry.vbuf_base_index,
                        index_base_index: geometry.ibuf_base_index,
                        material_index: geometry.material_index,
                        emission_index: geometry.emission_index,
                    });
                }
            }
        }
        if self.h_geometry_table.len() > MAX_NUM_GEOMETRY_TABLE_ENTRIES {
            panic!(
                "exceeded MAX_NUM_GEOMETRY_TABLE_ENTRIES ({})",
                MAX_NUM_GEOMETRY_TABLE_ENTRIES
            );
        }
        if self.h_base_instance_table.len() > MAX_NUM_BASE_INSTANCE_TABLE_ENTRIES {
            panic!(
                "exceeded MAX_NUM_BASE_INSTANCE_TABLE_ENTRIES ({})",
                MAX_NUM_BASE_INSTANCE_TABLE_ENTRIES
            );
        }

        // Top-level emitter CDF: emissive geometries in id order, then
        // the envmap when it carries any power
        let mut weights: Vec<f32> = self
            .emitter_cdfs
            .iter()
            .filter_map(|cdf| cdf.as_ref().map(|c| c.total_weight()))
            .collect();
        if self.envmap.average_weight() > 0.0 {
            weights.push(self.envmap.average_weight());
        }
        if weights.is_empty() {
            self.h_top_level_cdf.clear();
            self.d_top_level_cdf = None;
        } else {
            self.h_top_level_cdf = build_top_level_cdf(&weights);
            self.d_top_level_cdf = Some(create_storage_buffer_with_data(
                device,
                self.transfer_command_pool.as_mut(),
                "scene_top_level_emitter_cdf",
                bytemuck::cast_slice(&self.h_top_level_cdf),
            )?);
        }

        // One transfer batch for materials, emissions, and both tables
        let staging_materials = create_staging_buffer(
            device,
            "scene_staging_materials",
            bytemuck::cast_slice(&self.h_materials),
        )?;
        let staging_emissions = create_staging_buffer(
            device,
            "scene_staging_emissions",
            bytemuck::cast_slice(&self.h_emissions),
        )?;
        let staging_geometry_table = create_staging_buffer(
            device,
            "scene_staging_geometry_table",
            bytemuck::cast_slice(&self.h_geometry_table),
        )?;
        let staging_base_instance_table = create_staging_buffer(
            device,
            "scene_staging_base_instance_table",
            bytemuck::cast_slice(&self.h_base_instance_table),
        )?;

        let mut command_list = self.transfer_command_pool.get_command_list()?;
        command_list.begin()?;
        command_list.copy_buffer_to_buffer(
            self.d_materials.as_ref(),
            0,
            staging_materials.as_ref(),
            0,
            staging_materials.size(),
        )?;
        command_list.copy_buffer_to_buffer(
            self.d_emissions.as_ref(),
            0,
            staging_emissions.as_ref(),
            0,
            staging_emissions.size(),
        )?;
        if staging_geometry_table.size() > 0 {
            command_list.copy_buffer_to_buffer(
                self.d_geometry_table.as_ref(),
                0,
                staging_geometry_table.as_ref(),
                0,
                staging_geometry_table.size(),
            )?;
        }
        if staging_base_instance_table.size() > 0 {
            command_list.copy_buffer_to_buffer(
                self.d_base_instance_table.as_ref(),
                0,
                staging_base_instance_table.as_ref(),
                0,
                staging_base_instance_table.size(),
            )?;
        }
        command_list.end()?;
        submit_and_wait(device, command_list.as_mut(), "scene_commit_fence")?;

        crate::engine_info!(
            SOURCE,
            "Committed scene: {} base instances, {} instances, {} geometry rows, {} emitters",
            self.base_instances.len(),
            scene_desc.instances.len(),
            self.h_geometry_table.len(),
            weights.len()
        );
        Ok(())
    }

    fn build_blases(&mut self, device: &mut dyn Device) -> Result<()> {
        self.rt_blases.clear();
        for (base_instance_id, base_instance) in self.base_instances.iter().enumerate() {
            let mut geometry_descs = Vec::new();
            let mut is_updatable = false;
            for range in &base_instance.geometry_id_ranges {
                for geometry_id in range.iter() {
                    let geometry = &self.geometries[geometry_id as usize];
                    is_updatable |= geometry.is_updatable;
                    geometry_descs.push(BlasGeometryDesc {
                        vertex_buffer: self.d_vbuf_position.as_ref(),
                        vertex_offset: geometry.vbuf_base_index as u64 * POSITION_STRIDE,
                        vertex_format: BufferFormat::R32G32B32_SFLOAT,
                        vertex_stride: POSITION_STRIDE,
                        vertex_count: geometry.num_vertices,
                        index_buffer: self.d_ibuf.as_ref(),
                        index_offset: geometry.ibuf_base_index as u64 * INDEX_STRIDE,
                        index_type: IndexType::U16,
                        index_count: geometry.num_indices,
                        is_opaque: true,
                    });
                }
            }

            let hint = if is_updatable {
                AccelBuildHint::Deformable
            } else {
                AccelBuildHint::FastTrace
            };
            let blas = device.build_blas(&format!("blas_{}", base_instance_id), &geometry_descs, hint)?;
            self.rt_blases.push(blas);
        }
        Ok(())
    }

    fn build_tlas(&mut self, device: &mut dyn Device, scene_desc: &SceneDesc) -> Result<()> {
        let mut instance_descs = Vec::with_capacity(scene_desc.instances.len());
        for instance in &scene_desc.instances {
            let base_instance_id = instance.base_instance_id;
            instance_descs.push(crate::graphics_device::TlasInstanceDesc {
                blas: self.rt_blases[base_instance_id as usize].as_ref(),
                transform: transform_to_rows_3x4(&instance.transform),
                hit_group_offset: instance.hit_group_id,
                mask: 0xff,
                instance_id: base_instance_id,
            });
        }
        self.rt_tlas = Some(device.build_tlas("scene_tlas", &instance_descs)?);
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn geometries(&self) -> &[SceneGeometry] {
        &self.geometries
    }

    pub fn base_instances(&self) -> &[SceneBaseInstance] {
        &self.base_instances
    }

    pub fn tlas(&self) -> Option<&dyn Tlas> {
        self.rt_tlas.as_deref()
    }

    pub fn blases(&self) -> &[Box<dyn Blas>] {
        &self.rt_blases
    }

    pub fn materials(&self) -> &[StandardMaterial] {
        &self.h_materials
    }

    pub fn emissions(&self) -> &[StandardEmission] {
        &self.h_emissions
    }

    /// Number of loaded textures, including the reserved fallback slot
    pub fn texture_count(&self) -> usize {
        self.d_textures.len()
    }

    pub fn textures(&self) -> &[Box<dyn Texture>] {
        &self.d_textures
    }

    pub fn base_instance_table(&self) -> &[BaseInstanceTableEntry] {
        &self.h_base_instance_table
    }

    pub fn geometry_table(&self) -> &[GeometryTableEntry] {
        &self.h_geometry_table
    }

    pub fn vbuf_position_buffer(&self) -> &dyn Buffer {
        self.d_vbuf_position.as_ref()
    }

    pub fn vbuf_packed_buffer(&self) -> &dyn Buffer {
        self.d_vbuf_packed.as_ref()
    }

    pub fn ibuf_buffer(&self) -> &dyn Buffer {
        self.d_ibuf.as_ref()
    }

    pub fn materials_buffer(&self) -> &dyn Buffer {
        self.d_materials.as_ref()
    }

    pub fn emissions_buffer(&self) -> &dyn Buffer {
        self.d_emissions.as_ref()
    }

    pub fn base_instance_table_buffer(&self) -> &dyn Buffer {
        self.d_base_instance_table.as_ref()
    }

    pub fn geometry_table_buffer(&self) -> &dyn Buffer {
        self.d_geometry_table.as_ref()
    }

    /// Bottom-level CDF of one geometry; the sentinel buffer for
    /// non-emitters
    pub fn emitter_cdf_buffer(&self, geometry_id: u32) -> &dyn Buffer {
        match &self.d_emitter_cdfs[geometry_id as usize] {
            Some(buffer) => buffer.as_ref(),
            None => self.d_non_emitter_cdf.as_ref(),
        }
    }

    /// Host-side emitter CDF of one geometry, if it has one
    pub fn emitter_cdf(&self, geometry_id: u32) -> Option<&EmitterCdf> {
        self.emitter_cdfs[geometry_id as usize].as_ref()
    }

    /// Host copy of the top-level emitter CDF (empty before commit or
    /// when the scene has no emitters)
    pub fn top_level_cdf(&self) -> &[f32] {
        &self.h_top_level_cdf
    }

    /// Top-level CDF buffer; the sentinel buffer when no emitter exists
    pub fn top_level_cdf_buffer(&self) -> &dyn Buffer {
        match &self.d_top_level_cdf {
            Some(buffer) => buffer.as_ref(),
            None => self.d_non_emitter_cdf.as_ref(),
        }
    }

    pub fn envmap(&self) -> &Envmap {
        &self.envmap
    }

    pub fn envmap_texture(&self) -> &dyn Texture {
        self.d_envmap_texture.as_ref()
    }

    pub fn envmap_cdf_buffer(&self) -> &dyn Buffer {
        self.d_envmap_cdf.as_ref()
    }

    /// Vertices consumed in the mega-buffers (aligned)
    pub fn num_vertices_filled(&self) -> usize {
        self.num_vertices_filled
    }

    /// Indices consumed in the mega-buffers (aligned)
    pub fn num_indices_filled(&self) -> usize {
        self.num_indices_filled
    }

    #[cfg(test)]
    pub(crate) fn set_geometry_updatable(&mut self, geometry_id: u32, is_updatable: bool) {
        self.geometries[geometry_id as usize].is_updatable = is_updatable;
    }
}

// ===== UPLOAD HELPERS =====

fn create_staging_buffer(
    device: &mut dyn Device,
    name: &str,
    data: &[u8],
) -> Result<Box<dyn Buffer>> {
    let staging = device.create_buffer(BufferDesc {
        name: name.to_string(),
        size: data.len() as u64,
        usage: BufferUsage::TRANSFER_SRC,
        residency: MemoryResidency::CpuOnly,
    })?;
    if !data.is_empty() {
        staging.update(0, data)?;
    }
    Ok(staging)
}

/// Create a GPU-only storage buffer and fill it through a staging copy,
/// waiting for the transfer to finish.
fn create_storage_buffer_with_data(
    device: &mut dyn Device,
    command_pool: &mut dyn CommandPool,
    name: &str,
    data: &[u8],
) -> Result<Box<dyn Buffer>> {
    let buffer = device.create_buffer(BufferDesc {
        name: name.to_string(),
        size: data.len() as u64,
        usage: BufferUsage::TRANSFER_DST | BufferUsage::STORAGE,
        residency: MemoryResidency::GpuOnly,
    })?;
    let staging = create_staging_buffer(device, &format!("{}_staging", name), data)?;

    let mut command_list = command_pool.get_command_list()?;
    command_list.begin()?;
    command_list.copy_buffer_to_buffer(buffer.as_ref(), 0, staging.as_ref(), 0, data.len() as u64)?;
    command_list.end()?;
    submit_and_wait(device, command_list.as_mut(), &format!("{}_fence", name))?;
    Ok(buffer)
}

fn upload_envmap_texture(
    device: &mut dyn Device,
    command_pool: &mut dyn CommandPool,
    name: &str,
    envmap: &Envmap,
) -> Result<Box<dyn Texture>> {
    let format = TextureFormat::R32G32B32A32_SFLOAT;
    let texture = device.create_texture(TextureDesc {
        name: name.to_string(),
        width: envmap.width(),
        height: envmap.height(),
        format,
        usage: TextureUsage::TRANSFER_DST | TextureUsage::SAMPLED,
        initial_state: TextureState::TransferDst,
    })?;

    let row_bytes = envmap.width() as u64 * format.size_bytes_per_pixel() as u64;
    let aligned_row_bytes =
        row_bytes.div_ceil(device.data_pitch_alignment()) * device.data_pitch_alignment();
    let staging = device.create_buffer(BufferDesc {
        name: format!("{}_staging", name),
        size: aligned_row_bytes * envmap.height() as u64,
        usage: BufferUsage::TRANSFER_SRC,
        residency: MemoryResidency::CpuOnly,
    })?;
    let pixel_bytes: &[u8] = bytemuck::cast_slice(envmap.pixels());
    for row in 0..envmap.height() as u64 {
        let src_begin = (row * row_bytes) as usize;
        let src_end = src_begin + row_bytes as usize;
        staging.update(row * aligned_row_bytes, &pixel_bytes[src_begin..src_end])?;
    }

    let mut command_list = command_pool.get_command_list()?;
    command_list.begin()?;
    command_list.copy_buffer_to_texture(texture.as_ref(), staging.as_ref(), 0, aligned_row_bytes)?;
    command_list.transition_texture(
        texture.as_ref(),
        TextureState::TransferDst,
        TextureState::ShaderReadOnly,
    )?;
    command_list.end()?;
    submit_and_wait(device, command_list.as_mut(), &format!("{}_fence", name))?;
    Ok(texture)
}

fn submit_and_wait(
    device: &mut dyn Device,
    command_list: &mut dyn crate::graphics_device::CommandList,
    fence_name: &str,
) -> Result<()> {
    let fence = device.create_fence(fence_name)?;
    fence.reset();
    command_list.submit(&[], &[], Some(fence.as_ref()))?;
    fence.wait();
    Ok(())
}

#[cfg(test)]
#[path = "scene_resource_tests.rs"]
mod tests;
