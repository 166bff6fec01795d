//! Fixed physics timestep.
//!
//! The simulation is advanced by the host once per display frame with a
//! variable delta. [`FixedTimestep`] turns that into a whole number of fixed
//! physics sub-steps so the force integration behaves the same at 30, 60 or
//! 144 fps.
//!
//! # Example
//!
//! ```ignore
//! use palm_nebula::time::{FixedTimestep, FIXED_DT};
//!
//! let mut clock = FixedTimestep::new();
//!
//! // In your frame callback:
//! for _ in 0..clock.tick(frame_delta) {
//!     physics_step(FIXED_DT);
//! }
//! ```

/// Physics step length in seconds.
pub const FIXED_DT: f32 = 1.0 / 60.0;
/// Maximum physics sub-steps per frame.
pub const MAX_STEPS: u32 = 3;
/// Frame deltas longer than this are truncated (e.g. after a stall).
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Accumulator reconciling variable frame time with the fixed physics rate.
///
/// Under sustained slowdown at most [`MAX_STEPS`] run per frame and the
/// backlog of whole steps is dropped, so simulated time falls behind real
/// time instead of the per-frame cost growing without bound.
#[derive(Debug, Clone, Default)]
pub struct FixedTimestep {
    /// Unsimulated time carried between frames, in seconds.
    accumulator: f32,
    /// Total sub-steps executed.
    steps: u64,
    /// Total frames fed through `tick`.
    frames: u64,
    /// Sub-steps dropped by the catch-up cap.
    dropped_steps: u64,
}

impl FixedTimestep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame delta and return how many fixed sub-steps to run now.
    ///
    /// Negative or non-finite deltas count as zero.
    pub fn tick(&mut self, delta: f32) -> u32 {
        let delta = if delta.is_finite() {
            delta.clamp(0.0, MAX_FRAME_DELTA)
        } else {
            0.0
        };
        self.accumulator += delta;
        self.frames += 1;

        let mut count = 0;
        while self.accumulator >= FIXED_DT && count < MAX_STEPS {
            self.accumulator -= FIXED_DT;
            count += 1;
        }

        if self.accumulator >= FIXED_DT {
            self.dropped_steps += (self.accumulator / FIXED_DT) as u64;
            self.accumulator %= FIXED_DT;
        }

        self.steps += count as u64;
        count
    }

    /// Unsimulated time carried to the next frame.
    #[inline]
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Total sub-steps executed.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Total frames fed through [`FixedTimestep::tick`].
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Sub-steps skipped because a frame exceeded the catch-up cap.
    #[inline]
    pub fn dropped_steps(&self) -> u64 {
        self.dropped_steps
    }

    /// Total simulated time in seconds.
    #[inline]
    pub fn simulated_time(&self) -> f64 {
        self.steps as f64 * FIXED_DT as f64
    }
}
