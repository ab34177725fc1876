/// Emitter importance-sampling support
///
/// Builds the two-level CDF structure the path-tracing pass samples
/// lights through: a bottom-level CDF per emissive geometry (and one per
/// environment-map pixel), and a top-level CDF over all emitters.

pub mod emitter_cdf;
pub mod envmap;

pub use emitter_cdf::*;
pub use envmap::*;
