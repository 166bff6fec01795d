//! The host-facing simulation.
//!
//! [`NebulaSimulation`] owns two hand slots and, once a slot has been seen,
//! that slot's particle cloud. The host calls [`NebulaSimulation::advance`]
//! once per display frame with the frame delta and whatever hand samples the
//! tracker produced, then reads [`NebulaSimulation::snapshot`] to draw.
//!
//! ```ignore
//! use palm_nebula::prelude::*;
//!
//! let mut sim = NebulaSimulation::new(NebulaParams::default());
//! loop {
//!     let hands: Vec<LandmarkSample> = tracker.poll();
//!     sim.advance(frame_delta, &hands);
//!     for slot in 0..HAND_SLOTS {
//!         if let Some(snapshot) = sim.snapshot(slot) {
//!             renderer.draw(snapshot);
//!         }
//!     }
//! }
//! ```

use crate::buffers::RenderSnapshot;
use crate::cloud::ParticleCloud;
use crate::error::NebulaError;
use crate::field::HandInput;
use crate::hand::{HandSlot, HandState, Transition};
use crate::landmarks::{self, BoneTransform, Handedness, LandmarkSample, ProjectorConfig};
use crate::params::NebulaParams;
use crate::spawn::Spawner;
use crate::time::{FixedTimestep, FIXED_DT};
use tracing::{debug, trace};

/// Number of hand slots.
pub const HAND_SLOTS: usize = 2;

/// What one call to [`NebulaSimulation::advance`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// Fixed sub-steps executed.
    pub steps: u32,
    /// State change of each hand slot.
    pub transitions: [Transition; HAND_SLOTS],
    /// Whether any cloud recomputed its colors.
    pub recolored: bool,
}

/// Two-hand particle nebula.
#[derive(Debug)]
pub struct NebulaSimulation {
    params: NebulaParams,
    projector: ProjectorConfig,
    slots: [HandSlot; HAND_SLOTS],
    clouds: [Option<ParticleCloud>; HAND_SLOTS],
    clock: FixedTimestep,
    spawner: Spawner,
    /// Simulated seconds, advanced by `FIXED_DT` per sub-step.
    time: f64,
}

impl NebulaSimulation {
    /// Create a simulation seeded from OS entropy.
    pub fn new(params: NebulaParams) -> Self {
        Self::with_spawner(params, Spawner::from_entropy())
    }

    /// Create a simulation with a fixed seed. The same seed and inputs give
    /// the same particles.
    pub fn with_seed(params: NebulaParams, seed: u64) -> Self {
        Self::with_spawner(params, Spawner::from_seed(seed))
    }

    fn with_spawner(params: NebulaParams, spawner: Spawner) -> Self {
        Self {
            params: params.clamped(),
            projector: ProjectorConfig::default(),
            slots: [HandSlot::new(), HandSlot::new()],
            clouds: [None, None],
            clock: FixedTimestep::new(),
            spawner,
            time: 0.0,
        }
    }

    /// Replace the tracker-to-world mapping.
    pub fn with_projector(mut self, projector: ProjectorConfig) -> Self {
        self.projector = projector;
        self
    }

    /// Advance by one display frame.
    ///
    /// `hands` holds zero, one or two samples in normalized tracker
    /// coordinates. Samples are routed to slots by handedness; a slot with no
    /// sample this frame freezes. Runs however many fixed sub-steps the frame
    /// delta allows, then refreshes every cloud's output buffers.
    pub fn advance(&mut self, delta: f32, hands: &[LandmarkSample]) -> StepReport {
        for slot in &mut self.slots {
            slot.age(delta);
        }

        let assigned = assign_slots(hands);
        let mut transitions = [Transition::Unchanged; HAND_SLOTS];

        for (index, sample) in assigned.iter().enumerate() {
            let transition = match sample {
                Some(sample) => {
                    let world = self.projector.project(sample);
                    self.slots[index].observe(&world)
                }
                None => self.slots[index].miss(),
            };

            match transition {
                Transition::FirstSeen => {
                    let anchor = self.slots[index].anchor();
                    debug!(slot = index, ?anchor, "hand first seen, creating particle cloud");
                    if self.clouds[index].is_none() {
                        self.clouds[index] =
                            Some(ParticleCloud::new(&self.params, anchor, &mut self.spawner));
                    }
                }
                Transition::Resumed => debug!(slot = index, "hand tracking resumed"),
                Transition::Lost => debug!(slot = index, "hand tracking lost, freezing slot"),
                Transition::Unchanged => {}
            }
            transitions[index] = transition;
        }

        let steps = self.clock.tick(delta);
        for _ in 0..steps {
            let time = self.time as f32;
            for (slot, cloud) in self.slots.iter().zip(self.clouds.iter_mut()) {
                let Some(cloud) = cloud else {
                    continue;
                };
                let hand = HandInput {
                    landmarks: slot.landmarks(),
                    velocities: slot.velocities(),
                    palm: slot.palm(),
                };
                cloud.step(&self.params, &hand, time, FIXED_DT);
            }
            self.time += FIXED_DT as f64;
        }

        let mut recolored = false;
        for cloud in self.clouds.iter_mut().flatten() {
            recolored |= cloud.refresh_output(&self.params);
        }

        StepReport {
            steps,
            transitions,
            recolored,
        }
    }

    /// Current (clamped) parameters.
    #[inline]
    pub fn params(&self) -> &NebulaParams {
        &self.params
    }

    /// Replace the parameters.
    ///
    /// Values are clamped into range. A particle count change reinitializes
    /// every cloud; a trail change reallocates trail history. Either one
    /// refills the affected output buffers before returning. Everything else
    /// takes effect on the next sub-step.
    pub fn set_params(&mut self, params: NebulaParams) {
        let params = params.clamped();
        let reinit = params.nebula_particle_count != self.params.nebula_particle_count;
        self.params = params;

        if reinit {
            self.reinitialize();
            return;
        }
        for (index, cloud) in self.clouds.iter_mut().enumerate() {
            if let Some(cloud) = cloud {
                if cloud.sync_trails(&self.params) {
                    cloud.refresh_output(&self.params);
                    debug!(
                        slot = index,
                        enabled = self.params.trails_enabled,
                        length = self.params.trail_length,
                        "trail history reallocated"
                    );
                }
            }
        }
    }

    /// Set one parameter by its camelCase name.
    pub fn set_param(&mut self, name: &str, value: f32) -> Result<(), NebulaError> {
        let mut params = self.params.clone();
        params.set_by_name(name, value)?;
        self.set_params(params);
        Ok(())
    }

    /// Re-scatter every existing cloud around its hand's anchor.
    pub fn reinitialize(&mut self) {
        let slots = self.slots.iter().zip(self.clouds.iter_mut());
        for (index, (slot, cloud)) in slots.enumerate() {
            if let Some(cloud) = cloud {
                cloud.reinitialize(&self.params, slot.anchor(), &mut self.spawner);
                cloud.refresh_output(&self.params);
                debug!(
                    slot = index,
                    particles = cloud.len(),
                    generation = cloud.generation(),
                    "particle cloud reinitialized"
                );
            }
        }
    }

    /// Tracking state of a hand slot.
    pub fn slot_state(&self, slot: usize) -> HandState {
        self.slots.get(slot).map_or(HandState::Absent, HandSlot::state)
    }

    /// A hand slot.
    pub fn hand(&self, slot: usize) -> Option<&HandSlot> {
        self.slots.get(slot)
    }

    /// A slot's particle cloud, once the slot has been seen.
    pub fn cloud(&self, slot: usize) -> Option<&ParticleCloud> {
        self.clouds.get(slot)?.as_ref()
    }

    /// Render view of a slot's cloud.
    pub fn snapshot(&self, slot: usize) -> Option<RenderSnapshot<'_>> {
        self.cloud(slot).map(ParticleCloud::snapshot)
    }

    /// Bone transforms of a slot's latest (or frozen) landmarks.
    pub fn bones(&self, slot: usize) -> impl Iterator<Item = BoneTransform> + '_ {
        self.slots
            .get(slot)
            .filter(|s| s.is_populated())
            .into_iter()
            .flat_map(|s| landmarks::hand_bones(s.sample()))
    }

    /// The only currently tracked hand, if exactly one is tracked.
    pub fn collapsed_center_hand_index(&self) -> Option<usize> {
        landmarks::collapsed_center_hand_index([self.slots[0].is_live(), self.slots[1].is_live()])
    }

    /// Fail if any particle position or velocity is NaN or infinite.
    pub fn check_finite(&self) -> Result<(), NebulaError> {
        for (slot, cloud) in self.clouds.iter().enumerate() {
            if let Some(particle) = cloud.as_ref().and_then(ParticleCloud::first_non_finite) {
                return Err(NebulaError::NonFinite { slot, particle });
            }
        }
        Ok(())
    }

    /// Fixed-step clock statistics.
    #[inline]
    pub fn clock(&self) -> &FixedTimestep {
        &self.clock
    }

    /// Simulated seconds so far.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }
}

/// Route samples to slots: Left to 0, Right to 1, then anything unplaced
/// (unknown handedness, or a second sample claiming the same hand) to the
/// first free slot. Empty samples are skipped.
fn assign_slots(hands: &[LandmarkSample]) -> [Option<&LandmarkSample>; HAND_SLOTS] {
    let mut out = [None; HAND_SLOTS];
    let mut unplaced: [Option<&LandmarkSample>; HAND_SLOTS] = [None; HAND_SLOTS];
    let mut unplaced_count = 0;

    for sample in hands.iter().filter(|s| !s.is_empty()) {
        let preferred = match sample.handedness {
            Handedness::Left => Some(0),
            Handedness::Right => Some(1),
            Handedness::Unknown => None,
        };
        match preferred {
            Some(slot) if out[slot].is_none() => out[slot] = Some(sample),
            _ if unplaced_count < HAND_SLOTS => {
                unplaced[unplaced_count] = Some(sample);
                unplaced_count += 1;
            }
            _ => trace!(handedness = ?sample.handedness, "extra hand sample ignored"),
        }
    }

    for sample in unplaced.into_iter().flatten() {
        match out.iter().position(Option::is_none) {
            Some(slot) => out[slot] = Some(sample),
            None => trace!(handedness = ?sample.handedness, "extra hand sample ignored"),
        }
    }
    out
}
