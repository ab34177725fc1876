/// Small shared utilities

pub mod range;

pub use range::*;
