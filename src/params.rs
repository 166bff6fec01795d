//! Tunable parameters for the nebula simulation.
//!
//! All values are supplied by an external configuration layer (sliders,
//! presets, a JSON file) and are clamped to their documented ranges before the
//! simulation uses them. Clamping never fails: a value outside its range is
//! pulled back in, and a non-finite value falls back to the default.
//!
//! # Example
//!
//! ```ignore
//! let params = NebulaParams::default()
//!     .with_particle_count(800)
//!     .with_arms(3, 0.35)
//!     .with_trails(16);
//!
//! sim.set_params(params);
//! ```

use crate::error::ParamError;

/// Distance under which a landmark stops attracting (avoids jitter at contact).
pub const ATTRACTION_MIN_DISTANCE: f32 = 0.02;
/// Landmarks farther than this do not attract.
pub const ATTRACTION_RADIUS: f32 = 0.5;
/// Fast-moving landmarks repel particles within this radius.
pub const REPULSION_RADIUS: f32 = 0.25;
/// Landmark speed (world units/s) above which motion repulsion kicks in.
pub const REPULSION_MIN_SPEED: f32 = 0.1;
/// Hard cap on particle speed after every integration step.
pub const MAX_SPEED: f32 = 1.5;

/// Inclusive range of a numeric parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the range, using `fallback` for NaN/Infinity.
    pub fn clamp(&self, value: f32, fallback: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            fallback.clamp(self.min, self.max)
        }
    }
}

/// Every parameter name accepted by [`NebulaParams::set_by_name`] with its range.
///
/// `hue` is listed as `[0, 1]` but wraps rather than clamps.
pub const PARAM_RANGES: &[(&str, ParamRange)] = &[
    ("attractionStrength", ParamRange::new(0.0, 3.0)),
    ("separationStrength", ParamRange::new(0.0, 2.0)),
    ("separationRadius", ParamRange::new(0.02, 0.15)),
    ("motionRepulsion", ParamRange::new(0.0, 15.0)),
    ("damping", ParamRange::new(0.8, 0.99)),
    ("coreAttraction", ParamRange::new(0.0, 4.0)),
    ("orbitStrength", ParamRange::new(0.0, 4.0)),
    ("armCount", ParamRange::new(1.0, 6.0)),
    ("armStrength", ParamRange::new(0.0, 4.0)),
    ("armWidth", ParamRange::new(0.05, 1.5)),
    ("spiralPitch", ParamRange::new(-2.0, 2.0)),
    ("patternSpeed", ParamRange::new(-3.0, 3.0)),
    ("turbulence", ParamRange::new(0.0, 2.0)),
    ("nebulaRadius", ParamRange::new(0.1, 2.5)),
    ("nebulaParticleCount", ParamRange::new(50.0, 1200.0)),
    ("nebulaParticleSize", ParamRange::new(0.01, 0.3)),
    ("trailLength", ParamRange::new(2.0, 40.0)),
    ("trailOpacity", ParamRange::new(0.0, 1.0)),
    ("trailsEnabled", ParamRange::new(0.0, 1.0)),
    ("hue", ParamRange::new(0.0, 1.0)),
    ("saturation", ParamRange::new(0.0, 1.0)),
    ("lightness", ParamRange::new(0.0, 1.0)),
];

/// Look up the range of a parameter by its camelCase name.
pub fn param_range(name: &str) -> Option<ParamRange> {
    PARAM_RANGES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, range)| *range)
}

fn range_of(name: &str) -> ParamRange {
    // Only called with names from PARAM_RANGES.
    param_range(name).unwrap_or(ParamRange::new(f32::MIN, f32::MAX))
}

/// Full parameter set for a nebula simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct NebulaParams {
    /// Pull toward the nearest landmark.
    pub attraction_strength: f32,
    /// Push between neighboring particles.
    pub separation_strength: f32,
    /// Neighbor radius for separation. Also sets the spatial hash cell size.
    pub separation_radius: f32,
    /// Push away from fast-moving landmarks, scaled by landmark speed.
    pub motion_repulsion: f32,
    /// Per-step velocity multiplier.
    pub damping: f32,
    /// Pull toward the palm core.
    pub core_attraction: f32,
    /// Tangential swirl around the palm axis.
    pub orbit_strength: f32,
    /// Number of spiral arms.
    pub arm_count: u32,
    /// Pull toward the nearest spiral arm.
    pub arm_strength: f32,
    /// Angular width of each arm (radians, Gaussian sigma).
    pub arm_width: f32,
    /// Logarithmic spiral winding.
    pub spiral_pitch: f32,
    /// Arm rotation speed (radians/s).
    pub pattern_speed: f32,
    /// In-plane sinusoidal jitter.
    pub turbulence: f32,
    /// Radius of the sphere particles are scattered in on (re)initialization.
    pub nebula_radius: f32,
    /// Particles per hand cloud. Changing it reinitializes the clouds.
    pub nebula_particle_count: u32,
    /// Base particle size.
    pub nebula_particle_size: f32,
    /// Positions kept per particle for trails. Changing it reallocates trails.
    pub trail_length: u32,
    /// Alpha at the head of a trail.
    pub trail_opacity: f32,
    /// Whether trail history is recorded and emitted.
    pub trails_enabled: bool,
    /// Global hue, 0..1, wraps.
    pub hue: f32,
    /// Global saturation.
    pub saturation: f32,
    /// Global lightness.
    pub lightness: f32,
}

impl Default for NebulaParams {
    fn default() -> Self {
        Self {
            attraction_strength: 1.0,
            separation_strength: 0.5,
            separation_radius: 0.05,
            motion_repulsion: 4.0,
            damping: 0.92,
            core_attraction: 1.2,
            orbit_strength: 1.0,
            arm_count: 2,
            arm_strength: 1.0,
            arm_width: 0.4,
            spiral_pitch: 0.8,
            pattern_speed: 0.4,
            turbulence: 0.3,
            nebula_radius: 0.9,
            nebula_particle_count: 600,
            nebula_particle_size: 0.05,
            trail_length: 12,
            trail_opacity: 0.5,
            trails_enabled: false,
            hue: 0.62,
            saturation: 0.8,
            lightness: 0.6,
        }
    }
}

impl NebulaParams {
    /// Parameters with every force term switched off.
    ///
    /// Useful as a starting point when isolating a single behavior.
    pub fn inert() -> Self {
        Self {
            attraction_strength: 0.0,
            separation_strength: 0.0,
            motion_repulsion: 0.0,
            core_attraction: 0.0,
            orbit_strength: 0.0,
            arm_strength: 0.0,
            turbulence: 0.0,
            ..Self::default()
        }
    }

    /// Set the particle count per cloud.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.nebula_particle_count = count;
        self
    }

    /// Set the scatter radius.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.nebula_radius = radius;
        self
    }

    /// Set arm count and arm width.
    pub fn with_arms(mut self, count: u32, width: f32) -> Self {
        self.arm_count = count;
        self.arm_width = width;
        self
    }

    /// Enable trails with the given length.
    pub fn with_trails(mut self, length: u32) -> Self {
        self.trails_enabled = true;
        self.trail_length = length;
        self
    }

    /// Set the global color triple.
    pub fn with_color(mut self, hue: f32, saturation: f32, lightness: f32) -> Self {
        self.hue = hue;
        self.saturation = saturation;
        self.lightness = lightness;
        self
    }

    /// Return a copy with every value pulled into its documented range.
    pub fn clamped(&self) -> Self {
        let d = Self::default();
        let f = |name: &str, v: f32, fallback: f32| range_of(name).clamp(v, fallback);
        let int = |name: &str, v: u32| {
            let r = range_of(name);
            v.clamp(r.min as u32, r.max as u32)
        };

        Self {
            attraction_strength: f(
                "attractionStrength",
                self.attraction_strength,
                d.attraction_strength,
            ),
            separation_strength: f(
                "separationStrength",
                self.separation_strength,
                d.separation_strength,
            ),
            separation_radius: f("separationRadius", self.separation_radius, d.separation_radius),
            motion_repulsion: f("motionRepulsion", self.motion_repulsion, d.motion_repulsion),
            damping: f("damping", self.damping, d.damping),
            core_attraction: f("coreAttraction", self.core_attraction, d.core_attraction),
            orbit_strength: f("orbitStrength", self.orbit_strength, d.orbit_strength),
            arm_count: int("armCount", self.arm_count),
            arm_strength: f("armStrength", self.arm_strength, d.arm_strength),
            arm_width: f("armWidth", self.arm_width, d.arm_width),
            spiral_pitch: f("spiralPitch", self.spiral_pitch, d.spiral_pitch),
            pattern_speed: f("patternSpeed", self.pattern_speed, d.pattern_speed),
            turbulence: f("turbulence", self.turbulence, d.turbulence),
            nebula_radius: f("nebulaRadius", self.nebula_radius, d.nebula_radius),
            nebula_particle_count: int("nebulaParticleCount", self.nebula_particle_count),
            nebula_particle_size: f(
                "nebulaParticleSize",
                self.nebula_particle_size,
                d.nebula_particle_size,
            ),
            trail_length: int("trailLength", self.trail_length),
            trail_opacity: f("trailOpacity", self.trail_opacity, d.trail_opacity),
            trails_enabled: self.trails_enabled,
            hue: if self.hue.is_finite() {
                self.hue.rem_euclid(1.0)
            } else {
                d.hue
            },
            saturation: f("saturation", self.saturation, d.saturation),
            lightness: f("lightness", self.lightness, d.lightness),
        }
    }

    /// Set a parameter by its camelCase name, clamping into range.
    ///
    /// Integer parameters are rounded; `trailsEnabled` is true for values
    /// above 0.5. Non-finite values are rejected and leave the field unchanged.
    pub fn set_by_name(&mut self, name: &str, value: f32) -> Result<(), ParamError> {
        let (key, range) = PARAM_RANGES
            .iter()
            .find(|(n, _)| *n == name)
            .copied()
            .ok_or_else(|| ParamError::Unknown(name.to_string()))?;

        if !value.is_finite() {
            return Err(ParamError::NonFinite { name: key, value });
        }

        let v = value.clamp(range.min, range.max);
        let int = v.round() as u32;
        match key {
            "attractionStrength" => self.attraction_strength = v,
            "separationStrength" => self.separation_strength = v,
            "separationRadius" => self.separation_radius = v,
            "motionRepulsion" => self.motion_repulsion = v,
            "damping" => self.damping = v,
            "coreAttraction" => self.core_attraction = v,
            "orbitStrength" => self.orbit_strength = v,
            "armCount" => self.arm_count = int,
            "armStrength" => self.arm_strength = v,
            "armWidth" => self.arm_width = v,
            "spiralPitch" => self.spiral_pitch = v,
            "patternSpeed" => self.pattern_speed = v,
            "turbulence" => self.turbulence = v,
            "nebulaRadius" => self.nebula_radius = v,
            "nebulaParticleCount" => self.nebula_particle_count = int,
            "nebulaParticleSize" => self.nebula_particle_size = v,
            "trailLength" => self.trail_length = int,
            "trailOpacity" => self.trail_opacity = v,
            "trailsEnabled" => self.trails_enabled = v > 0.5,
            "hue" => self.hue = value.rem_euclid(1.0),
            "saturation" => self.saturation = v,
            "lightness" => self.lightness = v,
            _ => return Err(ParamError::Unknown(name.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_within_ranges() {
        let d = NebulaParams::default();
        assert_eq!(d.clamped(), d);
    }

    #[test]
    fn test_clamp_pulls_values_into_range() {
        let wild = NebulaParams {
            attraction_strength: 10.0,
            separation_radius: 0.0,
            damping: 1.5,
            arm_count: 0,
            spiral_pitch: -9.0,
            nebula_particle_count: 100_000,
            trail_length: 1,
            trail_opacity: -1.0,
            hue: 1.25,
            ..NebulaParams::default()
        };
        let c = wild.clamped();

        assert_eq!(c.attraction_strength, 3.0);
        assert_eq!(c.separation_radius, 0.02);
        assert_eq!(c.damping, 0.99);
        assert_eq!(c.arm_count, 1);
        assert_eq!(c.spiral_pitch, -2.0);
        assert_eq!(c.nebula_particle_count, 1200);
        assert_eq!(c.trail_length, 2);
        assert_eq!(c.trail_opacity, 0.0);
        assert!((c.hue - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_replaces_non_finite() {
        let p = NebulaParams {
            core_attraction: f32::NAN,
            turbulence: f32::INFINITY,
            hue: f32::NAN,
            ..NebulaParams::default()
        };
        let c = p.clamped();
        let d = NebulaParams::default();
        assert_eq!(c.core_attraction, d.core_attraction);
        assert_eq!(c.turbulence, d.turbulence);
        assert_eq!(c.hue, d.hue);
    }

    #[test]
    fn test_set_by_name() {
        let mut p = NebulaParams::default();
        p.set_by_name("armCount", 3.6).unwrap();
        p.set_by_name("motionRepulsion", 99.0).unwrap();
        p.set_by_name("trailsEnabled", 1.0).unwrap();

        assert_eq!(p.arm_count, 4);
        assert_eq!(p.motion_repulsion, 15.0);
        assert!(p.trails_enabled);
    }

    #[test]
    fn test_set_by_name_rejects_unknown_and_nan() {
        let mut p = NebulaParams::default();
        assert_eq!(
            p.set_by_name("gravity", 1.0),
            Err(ParamError::Unknown("gravity".to_string()))
        );
        assert!(matches!(
            p.set_by_name("damping", f32::NAN),
            Err(ParamError::NonFinite { name: "damping", .. })
        ));
        assert_eq!(p.damping, NebulaParams::default().damping);
    }

    #[test]
    fn test_every_range_name_is_settable() {
        let mut p = NebulaParams::default();
        for (name, range) in PARAM_RANGES {
            p.set_by_name(name, range.min).unwrap();
        }
        assert_eq!(p.clamped().arm_count, 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_camel_case_preset() {
        let json = r#"{ "armCount": 4, "coreAttraction": 2.5, "trailsEnabled": true }"#;
        let p: NebulaParams = serde_json::from_str(json).unwrap();
        assert_eq!(p.arm_count, 4);
        assert_eq!(p.core_attraction, 2.5);
        assert!(p.trails_enabled);
        assert_eq!(p.damping, NebulaParams::default().damping);
    }
}
