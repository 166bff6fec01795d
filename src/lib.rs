//! # palm-nebula
//!
//! Hand-driven particle nebulae for real-time visualizers.
//!
//! Each tracked hand gets its own cloud of particles. The cloud is pulled
//! toward the hand's landmarks, pushed away by fast finger motion, and swirled
//! into spiral arms around the palm. When tracking drops out the hand freezes
//! in place and the nebula keeps turning around it.
//!
//! palm-nebula is the simulation core only: it takes landmark samples in,
//! and hands out plain vertex buffers for whatever renderer you use.
//!
//! ## Quick Start
//!
//! ```ignore
//! use palm_nebula::prelude::*;
//!
//! let params = NebulaParams::default()
//!     .with_particle_count(800)
//!     .with_arms(3, 0.35)
//!     .with_trails(16);
//!
//! let mut sim = NebulaSimulation::new(params);
//!
//! // Once per display frame:
//! let hands = [LandmarkSample::new(&tracker_points, Handedness::Right)];
//! sim.advance(frame_delta, &hands);
//!
//! if let Some(snapshot) = sim.snapshot(1) {
//!     upload(snapshot.particle_bytes());
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Hands
//!
//! Samples are 21 landmarks in normalized tracker coordinates (x and y in
//! 0..1 across the image, z relative depth). A [`ProjectorConfig`] maps them
//! into world space. Left hands go to slot 0 and right hands to slot 1.
//!
//! ### Forces
//!
//! | Term | Parameter | Acts on |
//! |------|-----------|---------|
//! | Nearest-landmark pull | `attraction_strength` | every landmark |
//! | Motion repulsion | `motion_repulsion` | fast landmarks |
//! | Separation | `separation_strength` | neighboring particles |
//! | Core pull | `core_attraction` | palm frame |
//! | Orbital swirl | `orbit_strength` | palm frame |
//! | Spiral arms | `arm_strength` | palm frame |
//! | Turbulence | `turbulence` | palm frame |
//!
//! ### Time
//!
//! Physics runs at a fixed 60 Hz with at most three sub-steps per frame (see
//! [`time`]), so behavior does not depend on the display rate.

pub mod buffers;
pub mod cloud;
pub mod color;
pub mod error;
pub mod field;
pub mod hand;
pub mod landmarks;
pub mod params;
pub mod simulation;
pub mod spatial;
pub mod spawn;
pub mod time;
pub mod trails;

pub use buffers::{ParticleVertex, RenderSnapshot};
pub use bytemuck;
pub use cloud::ParticleCloud;
pub use error::{NebulaError, ParamError};
pub use glam::{Quat, Vec3};
pub use hand::{HandSlot, HandState, Transition};
pub use landmarks::{BoneTransform, Handedness, LandmarkSample, PalmFrame, ProjectorConfig};
pub use params::NebulaParams;
pub use simulation::{NebulaSimulation, StepReport, HAND_SLOTS};
pub use spatial::SpatialHash;
pub use time::FixedTimestep;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use palm_nebula::prelude::*;
/// ```
pub mod prelude {
    pub use crate::buffers::{ParticleVertex, RenderSnapshot};
    pub use crate::error::{NebulaError, ParamError};
    pub use crate::hand::HandState;
    pub use crate::landmarks::{Handedness, LandmarkSample, ProjectorConfig};
    pub use crate::params::NebulaParams;
    pub use crate::simulation::{NebulaSimulation, StepReport, HAND_SLOTS};
    pub use crate::time::FIXED_DT;
    pub use crate::{Quat, Vec3};
}
