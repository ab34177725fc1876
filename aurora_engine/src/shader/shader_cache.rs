//! Compiled-shader bytecode cache
//!
//! Compiled bytecode is cached on disk keyed by a hash of
//! (source path, entry point, defines), together with the source file's
//! last-modified time; a cache entry whose recorded mtime differs from
//! the file's current mtime is recompiled.
//!
//! Cache file layout: 8-byte version, 8-byte source mtime, 4-byte payload
//! length, payload bytes.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::engine_asset_err;
use crate::error::Result;
use crate::graphics_device::ShaderStage;

const CACHE_FILE_VERSION: u64 = 1;

/// A shader source to compile: file, entry point, stage, defines
#[derive(Debug, Clone)]
pub struct ShaderSrc {
    pub stage: ShaderStage,
    pub file_path: PathBuf,
    pub entry: String,
    pub defines: Vec<String>,
}

impl ShaderSrc {
    pub fn new(stage: ShaderStage, file_path: impl Into<PathBuf>, entry: &str) -> Self {
        Self {
            stage,
            file_path: file_path.into(),
            entry: entry.to_string(),
            defines: Vec::new(),
        }
    }
}

/// The shader cross-compiler boundary.
///
/// The compiler itself (HLSL to SPIR-V/DXIL) is an external collaborator;
/// the engine only consumes bytecode blobs.
pub trait ShaderCompiler: Send + Sync {
    fn compile(&self, src: &ShaderSrc) -> Result<Vec<u8>>;
}

/// On-disk bytecode cache
pub struct ShaderCache {
    cache_folder: PathBuf,
}

impl ShaderCache {
    /// Open (creating if needed) a cache folder
    pub fn new(cache_folder: impl Into<PathBuf>) -> Result<Self> {
        let cache_folder = cache_folder.into();
        fs::create_dir_all(&cache_folder).map_err(|e| {
            engine_asset_err!(
                "aurora::ShaderCache",
                "Cannot create shader cache folder '{}': {}",
                cache_folder.display(),
                e
            )
        })?;
        Ok(Self { cache_folder })
    }

    /// Fetch cached bytecode for `src`, recompiling through `compiler`
    /// when the cache entry is missing or the source file changed.
    pub fn get_or_compile(
        &self,
        src: &ShaderSrc,
        compiler: &dyn ShaderCompiler,
    ) -> Result<Vec<u8>> {
        let src_mtime = source_mtime(&src.file_path)?;
        let cache_path = self.cache_file_path(src);

        if let Some(payload) = read_cache_file(&cache_path, src_mtime) {
            return Ok(payload);
        }

        let payload = compiler.compile(src)?;
        if let Err(e) = write_cache_file(&cache_path, src_mtime, &payload) {
            // A broken cache write only costs a recompile next run
            crate::engine_warn!(
                "aurora::ShaderCache",
                "Failed to write shader cache '{}': {}",
                cache_path.display(),
                e
            );
        }
        Ok(payload)
    }

    fn cache_file_path(&self, src: &ShaderSrc) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        src.file_path.hash(&mut hasher);
        src.entry.hash(&mut hasher);
        src.defines.hash(&mut hasher);
        self.cache_folder
            .join(format!("{:016x}.shaderbin", hasher.finish()))
    }
}

fn source_mtime(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path).map_err(|e| {
        engine_asset_err!(
            "aurora::ShaderCache",
            "Cannot stat shader source '{}': {}",
            path.display(),
            e
        )
    })?;
    let modified = metadata.modified().map_err(|e| {
        engine_asset_err!(
            "aurora::ShaderCache",
            "No modification time for shader source '{}': {}",
            path.display(),
            e
        )
    })?;
    let since_epoch = modified
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    Ok(since_epoch.as_nanos() as u64)
}

fn read_cache_file(path: &Path, expected_mtime: u64) -> Option<Vec<u8>> {
    let mut file = fs::File::open(path).ok()?;

    let mut header = [0u8; 20];
    file.read_exact(&mut header).ok()?;
    let version = u64::from_le_bytes(header[0..8].try_into().unwrap());
    let mtime = u64::from_le_bytes(header[8..16].try_into().unwrap());
    let payload_len = u32::from_le_bytes(header[16..20].try_into().unwrap());

    if version != CACHE_FILE_VERSION || mtime != expected_mtime {
        return None;
    }

    let mut payload = vec![0u8; payload_len as usize];
    file.read_exact(&mut payload).ok()?;
    Some(payload)
}

fn write_cache_file(path: &Path, src_mtime: u64, payload: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(&CACHE_FILE_VERSION.to_le_bytes())?;
    file.write_all(&src_mtime.to_le_bytes())?;
    file.write_all(&(payload.len() as u32).to_le_bytes())?;
    file.write_all(payload)?;
    Ok(())
}

#[cfg(test)]
#[path = "shader_cache_tests.rs"]
mod tests;
