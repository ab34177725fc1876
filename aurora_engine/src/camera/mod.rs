/// Camera module

pub mod fps_camera;

pub use fps_camera::*;
