/// Render passes: G-buffer generation, path tracing, final composite

pub mod gbuffer;
pub mod path_tracing;
pub mod composite;

pub use gbuffer::*;
pub use path_tracing::*;
pub use composite::*;
