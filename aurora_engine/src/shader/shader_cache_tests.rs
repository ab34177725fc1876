/// Unit tests for shader_cache.rs

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::graphics_device::ShaderStage;
use crate::shader::{ShaderCache, ShaderCompiler, ShaderSrc};

struct CountingCompiler {
    compile_count: AtomicUsize,
}

impl CountingCompiler {
    fn new() -> Self {
        Self {
            compile_count: AtomicUsize::new(0),
        }
    }

    fn count(&self) -> usize {
        self.compile_count.load(Ordering::Relaxed)
    }
}

impl ShaderCompiler for CountingCompiler {
    fn compile(&self, src: &ShaderSrc) -> Result<Vec<u8>> {
        self.compile_count.fetch_add(1, Ordering::Relaxed);
        Ok(format!("blob:{}", src.entry).into_bytes())
    }
}

struct TestDirs {
    root: PathBuf,
}

impl TestDirs {
    fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "aurora_shader_cache_{}_{}",
            tag,
            std::process::id()
        ));
        std::fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    fn write_source(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }
}

impl Drop for TestDirs {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}

#[test]
fn test_second_fetch_hits_the_cache() {
    let dirs = TestDirs::new("hit");
    let source_path = dirs.write_source("pass.hlsl", "// shader");
    let cache = ShaderCache::new(dirs.cache_dir()).unwrap();
    let compiler = CountingCompiler::new();

    let src = ShaderSrc::new(ShaderStage::RayGen, &source_path, "RayGen");
    let first = cache.get_or_compile(&src, &compiler).unwrap();
    let second = cache.get_or_compile(&src, &compiler).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, b"blob:RayGen");
    assert_eq!(compiler.count(), 1);
}

#[test]
fn test_mtime_change_invalidates() {
    let dirs = TestDirs::new("mtime");
    let source_path = dirs.write_source("pass.hlsl", "// v1");
    let cache = ShaderCache::new(dirs.cache_dir()).unwrap();
    let compiler = CountingCompiler::new();

    let src = ShaderSrc::new(ShaderStage::Miss, &source_path, "Miss");
    cache.get_or_compile(&src, &compiler).unwrap();

    // Rewriting the source moves its mtime forward
    std::thread::sleep(std::time::Duration::from_millis(20));
    dirs.write_source("pass.hlsl", "// v2 with an edit");

    cache.get_or_compile(&src, &compiler).unwrap();
    assert_eq!(compiler.count(), 2);
}

#[test]
fn test_entries_and_defines_key_separately() {
    let dirs = TestDirs::new("keys");
    let source_path = dirs.write_source("pass.hlsl", "// shader");
    let cache = ShaderCache::new(dirs.cache_dir()).unwrap();
    let compiler = CountingCompiler::new();

    let raygen = ShaderSrc::new(ShaderStage::RayGen, &source_path, "RayGen");
    let miss = ShaderSrc::new(ShaderStage::Miss, &source_path, "Miss");
    let mut raygen_defined = raygen.clone();
    raygen_defined.defines.push("DEBUG=1".to_string());

    cache.get_or_compile(&raygen, &compiler).unwrap();
    cache.get_or_compile(&miss, &compiler).unwrap();
    cache.get_or_compile(&raygen_defined, &compiler).unwrap();
    // All three were distinct cache entries
    assert_eq!(compiler.count(), 3);

    // And all three now hit
    cache.get_or_compile(&raygen, &compiler).unwrap();
    cache.get_or_compile(&miss, &compiler).unwrap();
    cache.get_or_compile(&raygen_defined, &compiler).unwrap();
    assert_eq!(compiler.count(), 3);
}

#[test]
fn test_missing_source_is_an_asset_error() {
    let dirs = TestDirs::new("missing");
    let cache = ShaderCache::new(dirs.cache_dir()).unwrap();
    let compiler = CountingCompiler::new();

    let src = ShaderSrc::new(
        ShaderStage::Vertex,
        dirs.root.join("not_there.hlsl"),
        "VsMain",
    );
    let result = cache.get_or_compile(&src, &compiler);
    assert!(matches!(result, Err(crate::error::Error::AssetError(_))));
    assert_eq!(compiler.count(), 0);
}

#[test]
fn test_cache_file_layout() {
    let dirs = TestDirs::new("layout");
    let source_path = dirs.write_source("pass.hlsl", "// shader");
    let cache = ShaderCache::new(dirs.cache_dir()).unwrap();
    let compiler = CountingCompiler::new();

    let src = ShaderSrc::new(ShaderStage::Fragment, &source_path, "FsMain");
    let payload = cache.get_or_compile(&src, &compiler).unwrap();

    // One cache file: 8-byte version, 8-byte mtime, 4-byte length, payload
    let entries: Vec<_> = std::fs::read_dir(dirs.cache_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    let bytes = std::fs::read(&entries[0]).unwrap();
    assert_eq!(bytes.len(), 20 + payload.len());
    let stored_len = u32::from_le_bytes(bytes[16..20].try_into().unwrap());
    assert_eq!(stored_len as usize, payload.len());
    assert_eq!(&bytes[20..], &payload[..]);
}
