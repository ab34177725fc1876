//! Triangle-mesh emitter CDFs and the top-level emitter CDF
//!
//! Every CDF is a monotone float array with `cdf[0] == 0` and
//! `cdf[N] == 1`, so a shader can sample an entry in O(log n) from one
//! uniform number. A geometry that turns out to carry no emissive power
//! is represented by the `[-1.0]` sentinel so the shader can detect a
//! non-emitter without a second lookup.

use glam::Vec3;

use crate::settings::VertexIndex;

/// Weights below this are treated as zero
pub const SMALL_WEIGHT: f32 = 1e-8;

/// Tolerance for the accumulated CDF tail before it is clamped to 1
const CDF_TAIL_TOLERANCE: f32 = 1e-2;

/// What an emissive geometry's emission field resolved to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmissionSource {
    /// Constant emission color
    Constant(Vec3),
    /// Texture-backed emission; magnitude approximated as 1.0
    Texture,
}

impl EmissionSource {
    fn magnitude(&self) -> f32 {
        match self {
            EmissionSource::Constant(color) => color.length(),
            EmissionSource::Texture => 1.0,
        }
    }
}

/// Bottom-level CDF over the triangles of one emissive geometry
#[derive(Debug, Clone)]
pub struct EmitterCdf {
    cdf: Vec<f32>,
    total_weight: f32,
}

impl EmitterCdf {
    /// Build the per-triangle CDF of one geometry.
    ///
    /// `indices` are geometry-relative; triangle weight is
    /// `area * emission magnitude` with area `‖(p1-p0) x (p2-p0)‖ / 2`.
    pub fn from_triangles(
        positions: &[Vec3],
        indices: &[VertexIndex],
        emission: EmissionSource,
    ) -> Self {
        debug_assert!(indices.len() % 3 == 0);
        let num_triangles = indices.len() / 3;
        let emission_magnitude = emission.magnitude();

        let mut pdf = vec![0.0f32; num_triangles];
        let mut total_weight = 0.0f32;
        for (triangle, weight) in pdf.iter_mut().enumerate() {
            let p0 = positions[indices[triangle * 3] as usize];
            let p1 = positions[indices[triangle * 3 + 1] as usize];
            let p2 = positions[indices[triangle * 3 + 2] as usize];
            let area = (p1 - p0).cross(p2 - p0).length() * 0.5;
            *weight = area * emission_magnitude;
            total_weight += *weight;
        }

        if total_weight <= SMALL_WEIGHT {
            return Self {
                cdf: vec![NON_EMITTER_SENTINEL],
                total_weight: 0.0,
            };
        }

        for weight in &mut pdf {
            *weight /= total_weight;
        }

        let cdf = accumulate(&pdf);
        Self { cdf, total_weight }
    }

    /// The normalized CDF, length `num_triangles + 1`; or the sentinel
    /// `[-1.0]` for a zero-weight emitter.
    pub fn cdf(&self) -> &[f32] {
        &self.cdf
    }

    /// Unnormalized total weight of the geometry (its top-level weight)
    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    /// Whether the geometry actually emits
    pub fn is_emitter(&self) -> bool {
        self.total_weight > SMALL_WEIGHT
    }
}

/// Sentinel value marking a non-emitter bottom-level buffer
pub const NON_EMITTER_SENTINEL: f32 = -1.0;

/// Build the top-level CDF over emitter weights (emissive geometries in
/// id order, then the environment map).
///
/// A scene whose emitters all have zero weight gets a uniform top-level
/// CDF, keeping the sampled index valid.
pub fn build_top_level_cdf(weights: &[f32]) -> Vec<f32> {
    assert!(!weights.is_empty());
    let sum: f32 = weights.iter().sum();

    let pdf: Vec<f32> = if sum <= SMALL_WEIGHT {
        vec![1.0 / weights.len() as f32; weights.len()]
    } else {
        weights.iter().map(|w| w / sum).collect()
    };

    accumulate(&pdf)
}

/// Accumulate a normalized pdf into a CDF, asserting the tail lands on 1
/// within tolerance before clamping it exactly.
fn accumulate(pdf: &[f32]) -> Vec<f32> {
    let mut cdf = vec![0.0f32; pdf.len() + 1];
    for (i, p) in pdf.iter().enumerate() {
        cdf[i + 1] = cdf[i] + p;
    }
    let tail = cdf[pdf.len()];
    assert!(
        (tail - 1.0).abs() <= CDF_TAIL_TOLERANCE,
        "CDF tail {} is not 1.0 within tolerance",
        tail
    );
    cdf[pdf.len()] = 1.0;
    cdf
}

#[cfg(test)]
#[path = "emitter_cdf_tests.rs"]
mod tests;
