/// Shader source descriptions, the compiler seam, and the bytecode cache

pub mod shader_cache;

pub use shader_cache::*;
