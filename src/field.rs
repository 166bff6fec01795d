//! The procedural force field that shapes a hand's particle cloud.
//!
//! Forces are summed per particle from independent terms:
//!
//! | Term | Anchor | Neighbor policy |
//! |------|--------|-----------------|
//! | Landmark attraction | nearest landmark | nearest only |
//! | Motion repulsion | fast-moving landmarks | every landmark in range |
//! | Separation | other particles | spatial hash, every particle in range |
//! | Core attraction | palm core | - |
//! | Orbital swirl | palm axis | - |
//! | Spiral arms | palm plane | closest arm only |
//! | Turbulence | palm plane | - |
//!
//! Attraction deliberately picks a single landmark so the pull is decisive,
//! while repulsion reacts to any nearby fast mover.
//!
//! The palm terms need the palm frame; if the hand sample was too short to
//! derive one, those terms are skipped for the step. A cloud only ever sees
//! its own hand's landmarks.

use crate::landmarks::{PalmFrame, LANDMARK_COUNT};
use crate::params::{
    NebulaParams, ATTRACTION_MIN_DISTANCE, ATTRACTION_RADIUS, REPULSION_MIN_SPEED,
    REPULSION_RADIUS,
};
use crate::spatial::SpatialHash;
use glam::Vec3;
use std::f32::consts::{PI, TAU};
use tracing::trace;

/// Core attraction ramps up linearly within this distance of the core.
pub const CORE_SOFTENING_RADIUS: f32 = 0.25;
/// Offset in the swirl falloff `1 / (offset + r)`.
pub const ORBIT_SOFTENING: f32 = 0.2;
/// Swirl scale of a closed hand; an open hand reaches 1.0.
pub const ORBIT_CLOSED_SCALE: f32 = 0.15;
/// Smallest radius used when evaluating the logarithmic spiral.
pub const ARM_MIN_RADIUS: f32 = 0.05;
/// Separation ignores pairs closer than this (squared distance).
pub const SEPARATION_MIN_DIST_SQ: f32 = 1e-4;

const DIRECTION_EPSILON: f32 = 1e-6;

/// A hand's landmarks as seen by the force field.
#[derive(Clone, Copy, Debug)]
pub struct HandInput<'a> {
    /// World-space landmark positions.
    pub landmarks: &'a [Vec3],
    /// Landmark velocities, parallel to `landmarks`.
    pub velocities: &'a [Vec3],
    /// Palm frame, if it could be derived.
    pub palm: Option<&'a PalmFrame>,
}

/// Palm frame with an orthonormal in-plane basis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PalmBasis {
    pub core: Vec3,
    pub axis: Vec3,
    pub u: Vec3,
    pub v: Vec3,
    pub openness: f32,
}

impl PalmBasis {
    /// Build the basis. A non-unit or non-finite axis falls back to +Z.
    pub fn new(palm: &PalmFrame) -> Self {
        let axis = palm.axis.try_normalize().unwrap_or(Vec3::Z);
        let (u, v) = axis.any_orthonormal_pair();
        Self {
            core: palm.core,
            axis,
            u,
            v,
            openness: palm.openness.clamp(0.0, 1.0),
        }
    }
}

/// Compute the net force on every particle.
///
/// `hash` must have been rebuilt from `positions` for this step. `time` is
/// simulated seconds, used by the rotating arm pattern and turbulence.
/// `forces` is overwritten.
pub fn evaluate(
    params: &NebulaParams,
    hand: &HandInput<'_>,
    time: f32,
    positions: &[Vec3],
    hash: &SpatialHash,
    forces: &mut [Vec3],
) {
    let available = hand.landmarks.len().min(hand.velocities.len());
    let landmark_count = available.min(LANDMARK_COUNT);
    let landmarks = &hand.landmarks[..landmark_count];

    let mut speeds = [0.0f32; LANDMARK_COUNT];
    for (s, v) in speeds.iter_mut().zip(&hand.velocities[..landmark_count]) {
        *s = v.length();
    }
    let speeds = &speeds[..landmark_count];

    let basis = hand.palm.map(PalmBasis::new);
    if basis.is_none() {
        trace!(landmarks = landmark_count, "palm frame unavailable, skipping palm terms");
    }

    let separation_radius = params.separation_radius;

    for (i, (force, &p)) in forces.iter_mut().zip(positions).enumerate() {
        let mut f = Vec3::ZERO;

        if params.attraction_strength > 0.0 {
            f += landmark_attraction(p, landmarks, params.attraction_strength);
        }
        if params.motion_repulsion > 0.0 {
            f += motion_repulsion(p, landmarks, speeds, params.motion_repulsion);
        }
        if params.separation_strength > 0.0 {
            let strength = params.separation_strength;
            hash.for_each_neighbor(positions, i, separation_radius, |_, offset, dist_sq| {
                if dist_sq > SEPARATION_MIN_DIST_SQ {
                    let dist = dist_sq.sqrt();
                    f += offset / dist * strength * (1.0 - dist / separation_radius);
                }
            });
        }

        if let Some(basis) = &basis {
            f += core_attraction(p, basis, params.core_attraction);
            f += orbital_swirl(p, basis, params.orbit_strength);
            if params.arm_strength > 0.0 {
                f += spiral_arm_attraction(p, basis, params, time);
            }
            if params.turbulence > 0.0 {
                f += turbulence(p, basis, params.turbulence, time);
            }
        }

        *force = f;
    }
}

/// Pull toward the single nearest landmark, growing with distance.
pub fn landmark_attraction(p: Vec3, landmarks: &[Vec3], strength: f32) -> Vec3 {
    let mut nearest = None;
    let mut best = f32::INFINITY;
    for &lm in landmarks {
        let d = p.distance_squared(lm);
        if d < best {
            best = d;
            nearest = Some(lm);
        }
    }

    let Some(lm) = nearest else {
        return Vec3::ZERO;
    };
    let dist = best.sqrt();
    if dist > ATTRACTION_MIN_DISTANCE && dist < ATTRACTION_RADIUS {
        (lm - p) / dist * strength * (dist / ATTRACTION_RADIUS)
    } else {
        Vec3::ZERO
    }
}

/// Push away from every nearby landmark moving faster than the threshold.
pub fn motion_repulsion(p: Vec3, landmarks: &[Vec3], speeds: &[f32], strength: f32) -> Vec3 {
    let mut f = Vec3::ZERO;
    for (&lm, &speed) in landmarks.iter().zip(speeds) {
        if speed <= REPULSION_MIN_SPEED {
            continue;
        }
        let away = p - lm;
        let dist = away.length();
        if dist < REPULSION_RADIUS && dist > DIRECTION_EPSILON {
            f += away / dist * strength * speed * (1.0 - dist / REPULSION_RADIUS);
        }
    }
    f
}

/// Pull toward the palm core, softened near the core.
pub fn core_attraction(p: Vec3, basis: &PalmBasis, strength: f32) -> Vec3 {
    let to_core = basis.core - p;
    let r = to_core.length();
    if r < DIRECTION_EPSILON {
        return Vec3::ZERO;
    }
    to_core / r * strength * (r / CORE_SOFTENING_RADIUS).min(1.0)
}

/// Tangential swirl around the palm axis, strongest near the core.
pub fn orbital_swirl(p: Vec3, basis: &PalmBasis, strength: f32) -> Vec3 {
    let local = p - basis.core;
    let Some(tangent) = basis.axis.cross(local).try_normalize() else {
        return Vec3::ZERO;
    };
    let r = local.length();
    let openness_scale = ORBIT_CLOSED_SCALE + (1.0 - ORBIT_CLOSED_SCALE) * basis.openness;
    tangent * strength * openness_scale / (ORBIT_SOFTENING + r)
}

/// Wrap an angle into `[-PI, PI]`.
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Pull toward the closest logarithmic spiral arm.
///
/// The target is the point on the arm at the particle's own radius and
/// height, so the pull stays in the arm plane.
pub fn spiral_arm_attraction(p: Vec3, basis: &PalmBasis, params: &NebulaParams, time: f32) -> Vec3 {
    let local = p - basis.core;
    let x = local.dot(basis.u);
    let y = local.dot(basis.v);
    let height = local.dot(basis.axis);
    let rho = (x * x + y * y).sqrt().max(ARM_MIN_RADIUS);
    let theta = y.atan2(x);

    let arm_count = params.arm_count.max(1);
    let spiral_phase = params.spiral_pitch * rho.ln() + time * params.pattern_speed;

    let mut best_diff = f32::INFINITY;
    let mut best_angle = 0.0;
    for k in 0..arm_count {
        let arm_angle = k as f32 * TAU / arm_count as f32 + spiral_phase;
        let diff = wrap_angle(theta - arm_angle);
        if diff.abs() < best_diff.abs() {
            best_diff = diff;
            best_angle = arm_angle;
        }
    }

    let width = params.arm_width.max(1e-3);
    let density = (-(best_diff * best_diff) / (2.0 * width * width)).exp();

    let target = basis.core
        + basis.axis * height
        + (basis.u * best_angle.cos() + basis.v * best_angle.sin()) * rho;
    (target - p).normalize_or_zero() * params.arm_strength * density
}

/// Cheap sinusoidal jitter in the palm plane.
pub fn turbulence(p: Vec3, basis: &PalmBasis, strength: f32, time: f32) -> Vec3 {
    let a = (p.y * 3.1 + time * 0.9).sin() * (p.z * 2.3 - time * 0.7).cos();
    let b = (p.z * 2.7 - time * 0.6).sin() * (p.x * 3.7 + time * 1.1).cos();
    (basis.u * a + basis.v * b) * strength
}
