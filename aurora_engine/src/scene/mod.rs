/// Scene module - scene-level GPU resources and their build pipeline

pub mod compact_vertex;
pub mod material;
pub mod tables;
pub mod scene_resource;

pub use compact_vertex::*;
pub use material::*;
pub use tables::*;
pub use scene_resource::*;
