//! Random placement and per-particle jitter for new particle clouds.
//!
//! A [`Spawner`] wraps a small, fast RNG. Simulations seed it once, so a
//! fixed seed reproduces the same cloud every run.

use crate::color::HslOffset;
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Maximum absolute hue jitter per particle.
pub const HUE_JITTER: f32 = 0.06;
/// Maximum absolute saturation jitter per particle.
pub const SATURATION_JITTER: f32 = 0.15;
/// Maximum absolute lightness jitter per particle.
pub const LIGHTNESS_JITTER: f32 = 0.15;
/// Per-particle size factors are drawn from this range.
pub const SIZE_FACTOR_RANGE: (f32, f32) = (0.6, 1.4);

/// RNG with helpers for scattering particles.
#[derive(Debug, Clone)]
pub struct Spawner {
    rng: SmallRng,
}

impl Spawner {
    /// Deterministic spawner.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Spawner seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Random f32 in `min..max`. Returns `min` for an empty range.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    /// Random point inside a sphere of given radius, centered at origin.
    ///
    /// Distribution is uniform throughout the volume.
    pub fn random_in_sphere(&mut self, radius: f32) -> Vec3 {
        let theta = self.rng.gen_range(0.0..TAU);
        let cos_phi: f32 = self.rng.gen_range(-1.0..1.0);
        let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
        // Cube root for uniform volume distribution
        let r = radius * self.rng.gen::<f32>().cbrt();

        Vec3::new(
            r * sin_phi * theta.cos(),
            r * sin_phi * theta.sin(),
            r * cos_phi,
        )
    }

    /// Random color jitter for one particle.
    pub fn color_offset(&mut self) -> HslOffset {
        HslOffset {
            hue: self.random_range(-HUE_JITTER, HUE_JITTER),
            saturation: self.random_range(-SATURATION_JITTER, SATURATION_JITTER),
            lightness: self.random_range(-LIGHTNESS_JITTER, LIGHTNESS_JITTER),
        }
    }

    /// Random size multiplier for one particle.
    pub fn size_factor(&mut self) -> f32 {
        self.random_range(SIZE_FACTOR_RANGE.0, SIZE_FACTOR_RANGE.1)
    }
}
