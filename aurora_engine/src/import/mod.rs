/// Asset import adapter
///
/// Wraps the external mesh importer and image decoder behind neutral
/// source records, and splits imported meshes so every produced geometry
/// fits the renderer's index width.

pub mod source_scene;
pub mod splitter;

pub use source_scene::*;
pub use splitter::*;
