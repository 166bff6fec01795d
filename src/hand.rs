//! Per-slot hand tracking state.
//!
//! Each of the two hand slots runs a small state machine:
//!
//! ```text
//! Absent ──sample──▶ Live ──no sample──▶ Frozen ──sample──▶ Live
//! ```
//!
//! A slot never returns to `Absent`. When tracking is lost the last landmark
//! set and palm frame are kept, so the particle cloud keeps orbiting the last
//! known anchor instead of collapsing or jumping.

use crate::landmarks::{Handedness, LandmarkSample, PalmFrame, LANDMARK_COUNT};
use glam::Vec3;

/// Shortest interval used when differentiating landmark positions.
pub const MIN_SAMPLE_INTERVAL: f32 = 1.0 / 240.0;

/// Tracking state of one hand slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandState {
    /// Never observed.
    #[default]
    Absent,
    /// Received a sample this frame.
    Live,
    /// Observed before, but not this frame. Landmarks and palm are held.
    Frozen,
}

/// What an update did to the slot's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// State did not change.
    Unchanged,
    /// Absent -> Live.
    FirstSeen,
    /// Frozen -> Live.
    Resumed,
    /// Live -> Frozen.
    Lost,
}

/// Landmarks, landmark velocities and palm frame of one hand slot.
#[derive(Debug, Clone)]
pub struct HandSlot {
    state: HandState,
    handedness: Handedness,
    /// World-space landmarks of the latest sample.
    current: LandmarkSample,
    /// World-space landmarks of the sample before that.
    previous: LandmarkSample,
    velocities: [Vec3; LANDMARK_COUNT],
    /// Palm frame of the latest sample, if it had the reference landmarks.
    palm: Option<PalmFrame>,
    /// Last successfully derived palm frame, used for degenerate fallbacks.
    reference: PalmFrame,
    /// Seconds since the latest sample.
    sample_age: f32,
}

impl Default for HandSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl HandSlot {
    pub fn new() -> Self {
        let empty = LandmarkSample::from_points(&[], Handedness::Unknown);
        Self {
            state: HandState::Absent,
            handedness: Handedness::Unknown,
            current: empty,
            previous: empty,
            velocities: [Vec3::ZERO; LANDMARK_COUNT],
            palm: None,
            reference: PalmFrame::default(),
            sample_age: 0.0,
        }
    }

    #[inline]
    pub fn state(&self) -> HandState {
        self.state
    }

    /// Observed at least once (Live or Frozen).
    #[inline]
    pub fn is_populated(&self) -> bool {
        self.state != HandState::Absent
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.state == HandState::Live
    }

    /// Handedness reported by the latest sample.
    #[inline]
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// World-space landmarks of the latest sample (held while frozen).
    #[inline]
    pub fn landmarks(&self) -> &[Vec3] {
        self.current.points()
    }

    /// The latest world-space sample itself.
    #[inline]
    pub fn sample(&self) -> &LandmarkSample {
        &self.current
    }

    /// Landmark velocities, one per valid landmark. Zero while frozen.
    #[inline]
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities[..self.current.len()]
    }

    /// Palm frame, if the latest sample had the reference landmarks.
    #[inline]
    pub fn palm(&self) -> Option<&PalmFrame> {
        self.palm.as_ref()
    }

    /// Best guess at where the hand is, for scattering a new cloud.
    pub fn anchor(&self) -> Vec3 {
        if let Some(palm) = &self.palm {
            return palm.core;
        }
        let points = self.current.points();
        if points.is_empty() {
            Vec3::ZERO
        } else {
            points.iter().copied().sum::<Vec3>() / points.len() as f32
        }
    }

    /// Let time pass. Call once per frame before `observe` / `miss`.
    pub fn age(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.sample_age += delta;
        }
    }

    /// Accept a new world-space sample.
    pub fn observe(&mut self, sample: &LandmarkSample) -> Transition {
        let transition = match self.state {
            HandState::Absent => Transition::FirstSeen,
            HandState::Frozen => Transition::Resumed,
            HandState::Live => Transition::Unchanged,
        };

        if transition == Transition::FirstSeen {
            self.previous = *sample;
            self.velocities = [Vec3::ZERO; LANDMARK_COUNT];
        } else {
            self.previous = self.current;
            let dt = self.sample_age.max(MIN_SAMPLE_INTERVAL);
            let prev = self.previous.points();
            for (i, v) in self.velocities.iter_mut().enumerate() {
                *v = match (sample.get(i), prev.get(i)) {
                    (Some(now), Some(&before)) => (now - before) / dt,
                    _ => Vec3::ZERO,
                };
            }
        }

        self.current = *sample;
        self.handedness = sample.handedness;
        self.sample_age = 0.0;
        self.palm = PalmFrame::from_landmarks(self.current.points(), &self.reference);
        if let Some(palm) = self.palm {
            self.reference = palm;
        }
        self.state = HandState::Live;
        transition
    }

    /// No sample arrived for this slot this frame.
    pub fn miss(&mut self) -> Transition {
        match self.state {
            HandState::Live => {
                self.state = HandState::Frozen;
                // Frozen landmarks do not move.
                self.previous = self.current;
                self.velocities = [Vec3::ZERO; LANDMARK_COUNT];
                Transition::Lost
            }
            _ => Transition::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::tests::open_hand;

    fn sample_at(center: Vec3) -> LandmarkSample {
        LandmarkSample::from_points(&open_hand(center), Handedness::Right)
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut slot = HandSlot::new();
        assert_eq!(slot.state(), HandState::Absent);
        assert_eq!(slot.miss(), Transition::Unchanged);
        assert_eq!(slot.state(), HandState::Absent);

        assert_eq!(slot.observe(&sample_at(Vec3::ZERO)), Transition::FirstSeen);
        assert!(slot.is_live());
        assert_eq!(slot.observe(&sample_at(Vec3::ZERO)), Transition::Unchanged);

        assert_eq!(slot.miss(), Transition::Lost);
        assert_eq!(slot.state(), HandState::Frozen);
        assert_eq!(slot.miss(), Transition::Unchanged);
        assert!(slot.is_populated());

        assert_eq!(slot.observe(&sample_at(Vec3::ZERO)), Transition::Resumed);
        assert!(slot.is_live());
    }

    #[test]
    fn test_first_sample_has_zero_velocity() {
        let mut slot = HandSlot::new();
        slot.age(0.5);
        slot.observe(&sample_at(Vec3::ONE));
        assert!(slot.velocities().iter().all(|v| *v == Vec3::ZERO));
        assert_eq!(slot.velocities().len(), LANDMARK_COUNT);
    }

    #[test]
    fn test_velocity_uses_time_since_previous_sample() {
        let mut slot = HandSlot::new();
        slot.observe(&sample_at(Vec3::ZERO));
        // Two frames pass before the next sample.
        slot.age(0.05);
        slot.age(0.05);
        slot.observe(&sample_at(Vec3::new(0.1, 0.0, 0.0)));

        for v in slot.velocities() {
            assert!((v.x - 1.0).abs() < 1e-4);
        }
        assert_eq!(slot.previous.points()[0], open_hand(Vec3::ZERO)[0]);
    }

    #[test]
    fn test_freeze_holds_landmarks_and_palm() {
        let mut slot = HandSlot::new();
        slot.observe(&sample_at(Vec3::new(0.3, 0.2, 0.0)));
        slot.age(0.016);
        slot.observe(&sample_at(Vec3::new(0.35, 0.2, 0.0)));
        let palm = *slot.palm().unwrap();
        let landmarks = slot.landmarks().to_vec();

        slot.miss();
        slot.age(3.0);
        slot.miss();

        assert_eq!(slot.palm(), Some(&palm));
        assert_eq!(slot.landmarks(), &landmarks[..]);
        assert!(slot.velocities().iter().all(|v| *v == Vec3::ZERO));
    }

    #[test]
    fn test_short_sample_has_no_palm_but_keeps_points() {
        let mut slot = HandSlot::new();
        let short = LandmarkSample::from_points(&open_hand(Vec3::ZERO)[..6], Handedness::Left);
        slot.observe(&short);
        assert!(slot.palm().is_none());
        assert_eq!(slot.landmarks().len(), 6);
        assert_eq!(slot.velocities().len(), 6);
        assert!(slot.anchor().is_finite());
    }

    #[test]
    fn test_degenerate_palm_keeps_last_axis() {
        let mut slot = HandSlot::new();
        slot.observe(&sample_at(Vec3::ZERO));
        let axis = slot.palm().unwrap().axis;

        let collapsed =
            LandmarkSample::from_points(&[Vec3::ONE; LANDMARK_COUNT], Handedness::Right);
        slot.age(0.016);
        slot.observe(&collapsed);
        assert_eq!(slot.palm().unwrap().axis, axis);
    }
}
