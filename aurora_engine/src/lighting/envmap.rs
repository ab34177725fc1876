//! Environment map and its per-pixel sampling CDF
//!
//! The environment map is one more emitter. Its bottom-level CDF runs
//! over all pixels, weighted by `luminance * sin(pi * v)` to compensate
//! the equal-area distortion of the equirectangular parametrization; its
//! top-level weight is the sine-weighted average luminance.

use glam::{Vec3, Vec4};
use std::f32::consts::PI;
use std::path::Path;

use crate::engine_asset_err;
use crate::error::Result;
use crate::lighting::SMALL_WEIGHT;

pub struct Envmap {
    width: u32,
    height: u32,
    /// RGBA32F pixels, row-major from the top row
    pixels: Vec<Vec4>,
    average_weight: f32,
    cdf: Vec<f32>,
}

impl Envmap {
    /// A blank 1x1 black environment (the default): weight zero, CDF over
    /// one pixel.
    pub fn blank() -> Self {
        Self::from_pixels(vec![Vec4::ZERO], 1, 1)
    }

    /// Load an equirectangular environment image
    pub fn from_path(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|e| {
            engine_asset_err!(
                "aurora::Envmap",
                "Failed to decode environment map '{}': {}",
                path.display(),
                e
            )
        })?;
        let rgba = decoded.to_rgba32f();
        let (width, height) = (rgba.width(), rgba.height());
        let pixels = rgba
            .pixels()
            .map(|p| Vec4::new(p.0[0], p.0[1], p.0[2], p.0[3]))
            .collect();
        crate::engine_info!(
            "aurora::Envmap",
            "Loaded environment map '{}' ({}x{})",
            path.display(),
            width,
            height
        );
        Ok(Self::from_pixels(pixels, width, height))
    }

    /// Build from raw pixels (also the test entry point)
    pub fn from_pixels(pixels: Vec<Vec4>, width: u32, height: u32) -> Self {
        assert_eq!(pixels.len(), (width * height) as usize);

        // Top-level weight: length of the sine-weighted pixel average
        let mut sum = Vec3::ZERO;
        for row in 0..height {
            let v = row as f32 / height as f32;
            let sine_term = (PI * v).sin();
            for column in 0..width {
                let value = pixels[(row * width + column) as usize].truncate();
                sum += sine_term * value;
            }
        }
        let average = sum / (width * height) as f32;
        let average_weight = average.length();

        let cdf = build_pixel_cdf(&pixels, width, height);

        Self {
            width,
            height,
            pixels,
            average_weight,
            cdf,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    /// Sine-weighted average luminance; the envmap's top-level weight
    pub fn average_weight(&self) -> f32 {
        self.average_weight
    }

    /// Per-pixel CDF, length `width * height + 1`
    pub fn cdf(&self) -> &[f32] {
        &self.cdf
    }
}

impl Default for Envmap {
    fn default() -> Self {
        Self::blank()
    }
}

fn build_pixel_cdf(pixels: &[Vec4], width: u32, height: u32) -> Vec<f32> {
    let num_pixels = (width * height) as usize;
    let mut pdf = vec![0.0f32; num_pixels];
    for row in 0..height {
        let v = row as f32 / height as f32;
        let sine_term = (PI * v).sin();
        for column in 0..width {
            let index = (row * width + column) as usize;
            pdf[index] = pixels[index].truncate().length() * sine_term;
        }
    }

    let sum: f32 = pdf.iter().sum();
    let mut cdf = vec![0.0f32; num_pixels + 1];
    if sum <= SMALL_WEIGHT {
        // A black envmap keeps an all-zero CDF; the top level gives it
        // zero probability so it is never sampled.
        return cdf;
    }

    for i in 0..num_pixels {
        cdf[i + 1] = cdf[i] + pdf[i] / sum;
    }
    cdf[num_pixels] = 1.0;
    cdf
}

#[cfg(test)]
#[path = "envmap_tests.rs"]
mod tests;
