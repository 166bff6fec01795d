//! Hand landmarks and their projection into simulation space.
//!
//! A hand-tracking provider delivers 21 points per hand in normalized image
//! coordinates (x, y in 0..1, y pointing down) plus a relative depth. This
//! module maps those samples into world space and derives the [`PalmFrame`]
//! the force field is anchored to.
//!
//! # Degenerate input
//!
//! Nothing in here may produce NaN. Non-finite input coordinates are zeroed
//! during projection, a collapsed palm keeps the previous axis, and a bone
//! between two coincident points has zero length and identity rotation.

use crate::error::NebulaError;
use glam::{Quat, Vec3};
use std::str::FromStr;

/// Number of landmarks per tracked hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Fingertips used for the openness estimate.
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// Bone connections for drawing a hand skeleton.
pub const HAND_SKELETON: [(usize, usize); 21] = [
    (WRIST, THUMB_CMC),
    (THUMB_CMC, THUMB_MCP),
    (THUMB_MCP, THUMB_IP),
    (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_MCP),
    (INDEX_MCP, INDEX_PIP),
    (INDEX_PIP, INDEX_DIP),
    (INDEX_DIP, INDEX_TIP),
    (WRIST, MIDDLE_MCP),
    (MIDDLE_MCP, MIDDLE_PIP),
    (MIDDLE_PIP, MIDDLE_DIP),
    (MIDDLE_DIP, MIDDLE_TIP),
    (WRIST, RING_MCP),
    (RING_MCP, RING_PIP),
    (RING_PIP, RING_DIP),
    (RING_DIP, RING_TIP),
    (WRIST, PINKY_MCP),
    (PINKY_MCP, PINKY_PIP),
    (PINKY_PIP, PINKY_DIP),
    (PINKY_DIP, PINKY_TIP),
    (INDEX_MCP, MIDDLE_MCP),
];

/// Fingertip-to-wrist distance, in palm lengths, of a closed fist.
const CLOSED_SPREAD: f32 = 1.0;
/// Fingertip-to-wrist distance, in palm lengths, of a fully open hand.
const OPEN_SPREAD: f32 = 1.7;

const DEGENERATE_EPSILON: f32 = 1e-6;

/// Which hand a sample belongs to, as reported by the tracker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
    #[default]
    Unknown,
}

impl FromStr for Handedness {
    type Err = NebulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Handedness::Left),
            "right" | "r" => Ok(Handedness::Right),
            "" | "unknown" => Ok(Handedness::Unknown),
            _ => Err(NebulaError::InvalidHandedness(s.to_string())),
        }
    }
}

/// One tracked hand: up to 21 points plus handedness.
///
/// Samples shorter than 21 points are accepted; [`LandmarkSample::len`]
/// reports how many points are valid and the force field skips whatever
/// needs the missing ones.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandmarkSample {
    points: [Vec3; LANDMARK_COUNT],
    len: usize,
    pub handedness: Handedness,
}

impl LandmarkSample {
    /// Build a sample from raw `[x, y, z]` triples. Extra points are ignored.
    pub fn new(points: &[[f32; 3]], handedness: Handedness) -> Self {
        let mut out = [Vec3::ZERO; LANDMARK_COUNT];
        let len = points.len().min(LANDMARK_COUNT);
        for (dst, src) in out.iter_mut().zip(points) {
            *dst = Vec3::from_array(*src);
        }
        Self { points: out, len, handedness }
    }

    /// Build a sample from vectors. Extra points are ignored.
    pub fn from_points(points: &[Vec3], handedness: Handedness) -> Self {
        let mut out = [Vec3::ZERO; LANDMARK_COUNT];
        let len = points.len().min(LANDMARK_COUNT);
        out[..len].copy_from_slice(&points[..len]);
        Self { points: out, len, handedness }
    }

    /// The valid points.
    #[inline]
    pub fn points(&self) -> &[Vec3] {
        &self.points[..self.len]
    }

    /// Number of valid points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether all 21 landmarks are present.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.len == LANDMARK_COUNT
    }

    /// Landmark at `index`, if present.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.points().get(index).copied()
    }
}

/// Mapping from normalized tracker coordinates into world space.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ProjectorConfig {
    /// World-space width covered by the full image width.
    pub width: f32,
    /// World-space height covered by the full image height.
    pub height: f32,
    /// Multiplier applied to the tracker's relative depth.
    pub depth_scale: f32,
    /// Flip horizontally (selfie view).
    pub mirror: bool,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            width: 2.0,
            height: 1.5,
            depth_scale: 1.0,
            mirror: true,
        }
    }
}

impl ProjectorConfig {
    /// Project one normalized point into world space.
    ///
    /// Image center maps to the origin, image up maps to +Y, and points closer
    /// to the camera (negative tracker depth) map to +Z.
    pub fn project_point(&self, raw: Vec3) -> Vec3 {
        let clean = |v: f32| if v.is_finite() { v } else { 0.0 };
        let raw = Vec3::new(clean(raw.x), clean(raw.y), clean(raw.z));
        let sign = if self.mirror { -1.0 } else { 1.0 };
        Vec3::new(
            (raw.x - 0.5) * self.width * sign,
            (0.5 - raw.y) * self.height,
            -raw.z * self.depth_scale,
        )
    }

    /// Project every valid point of a sample.
    pub fn project(&self, sample: &LandmarkSample) -> LandmarkSample {
        let mut out = *sample;
        for p in out.points[..out.len].iter_mut() {
            *p = self.project_point(*p);
        }
        out
    }
}

/// Anchor of the procedural force field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PalmFrame {
    /// Mean of wrist, index MCP, middle MCP and pinky MCP.
    pub core: Vec3,
    /// Unit palm normal.
    pub axis: Vec3,
    /// 0 for a fist, 1 for a fully spread hand.
    pub openness: f32,
}

impl Default for PalmFrame {
    fn default() -> Self {
        Self {
            core: Vec3::ZERO,
            axis: Vec3::Z,
            openness: 0.0,
        }
    }
}

impl PalmFrame {
    /// Derive a palm frame from world-space landmarks.
    ///
    /// Returns `None` when the four reference landmarks are not all present.
    /// A degenerate palm keeps `previous.axis`; a sample without fingertips
    /// or with a collapsed palm keeps `previous.openness`.
    pub fn from_landmarks(points: &[Vec3], previous: &PalmFrame) -> Option<PalmFrame> {
        if points.len() <= PINKY_MCP {
            return None;
        }
        let wrist = points[WRIST];
        let index = points[INDEX_MCP];
        let middle = points[MIDDLE_MCP];
        let pinky = points[PINKY_MCP];

        let core = (wrist + index + middle + pinky) * 0.25;

        let normal = (pinky - index).cross(middle - wrist);
        let axis = if normal.length_squared() > DEGENERATE_EPSILON * DEGENERATE_EPSILON {
            normal.normalize()
        } else {
            previous.axis
        };

        let openness = openness(points, previous.openness);

        Some(PalmFrame { core, axis, openness })
    }
}

fn openness(points: &[Vec3], fallback: f32) -> f32 {
    if points.len() < LANDMARK_COUNT {
        return fallback;
    }
    let wrist = points[WRIST];
    let palm_length = wrist.distance(points[MIDDLE_MCP]);
    if palm_length < DEGENERATE_EPSILON {
        return fallback;
    }

    let spread = FINGERTIPS
        .iter()
        .map(|&tip| points[tip].distance(wrist))
        .sum::<f32>()
        / FINGERTIPS.len() as f32;

    ((spread / palm_length - CLOSED_SPREAD) / (OPEN_SPREAD - CLOSED_SPREAD)).clamp(0.0, 1.0)
}

/// Placement of a bone segment between two landmarks.
///
/// The rotation maps +Y onto the bone direction, so a unit cylinder along Y
/// scaled by `length` and placed at `midpoint` covers the bone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTransform {
    pub midpoint: Vec3,
    pub length: f32,
    pub rotation: Quat,
}

impl BoneTransform {
    /// Transform for the bone from `a` to `b`.
    ///
    /// Coincident points give length 0 and identity rotation.
    pub fn between(a: Vec3, b: Vec3) -> Self {
        let delta = b - a;
        let length = delta.length();
        if !length.is_finite() || length < DEGENERATE_EPSILON {
            return Self {
                midpoint: a,
                length: 0.0,
                rotation: Quat::IDENTITY,
            };
        }
        Self {
            midpoint: a + delta * 0.5,
            length,
            rotation: Quat::from_rotation_arc(Vec3::Y, delta / length),
        }
    }
}

/// Bone transforms for every skeleton connection present in `sample`.
pub fn hand_bones(sample: &LandmarkSample) -> impl Iterator<Item = BoneTransform> + '_ {
    HAND_SKELETON.iter().filter_map(move |&(a, b)| {
        Some(BoneTransform::between(sample.get(a)?, sample.get(b)?))
    })
}

/// Index of the only populated hand slot.
///
/// Returns `None` when both or neither slot is populated. Used to center the
/// view on a single hand.
pub fn collapsed_center_hand_index(populated: [bool; 2]) -> Option<usize> {
    match populated {
        [true, false] => Some(0),
        [false, true] => Some(1),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A flat, open right hand in world space lying in the XY plane.
    pub(crate) fn open_hand(center: Vec3) -> [Vec3; LANDMARK_COUNT] {
        let mut p = [Vec3::ZERO; LANDMARK_COUNT];
        let finger_x = [-0.08, -0.04, 0.0, 0.04, 0.08];
        p[WRIST] = Vec3::new(0.0, -0.1, 0.0);
        for (f, &x) in finger_x.iter().enumerate() {
            let base = 1 + f * 4;
            for j in 0..4 {
                p[base + j] = Vec3::new(x, 0.0 + j as f32 * 0.03, 0.0);
            }
        }
        p[THUMB_TIP] = Vec3::new(-0.16, 0.0, 0.0);
        for q in p.iter_mut() {
            *q += center;
        }
        p
    }

    #[test]
    fn test_handedness_from_str() {
        assert_eq!("Left".parse::<Handedness>().unwrap(), Handedness::Left);
        assert_eq!(" right ".parse::<Handedness>().unwrap(), Handedness::Right);
        assert_eq!("".parse::<Handedness>().unwrap(), Handedness::Unknown);
        assert!("sideways".parse::<Handedness>().is_err());
    }

    #[test]
    fn test_sample_truncates_and_tracks_len() {
        let raw = vec![[0.5, 0.5, 0.0]; 30];
        let s = LandmarkSample::new(&raw, Handedness::Left);
        assert_eq!(s.len(), LANDMARK_COUNT);
        assert!(s.is_complete());

        let short = LandmarkSample::new(&raw[..4], Handedness::Left);
        assert_eq!(short.len(), 4);
        assert_eq!(short.get(PINKY_MCP), None);
    }

    #[test]
    fn test_projection_maps_center_to_origin() {
        let cfg = ProjectorConfig::default();
        let p = cfg.project_point(Vec3::new(0.5, 0.5, 0.0));
        assert!(p.length() < 1e-6);

        // Top-left of the image, mirrored: right side, up.
        let tl = cfg.project_point(Vec3::new(0.0, 0.0, -0.1));
        assert!((tl.x - 1.0).abs() < 1e-6);
        assert!((tl.y - 0.75).abs() < 1e-6);
        assert!((tl.z - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_projection_zeroes_non_finite() {
        let cfg = ProjectorConfig { mirror: false, ..Default::default() };
        let p = cfg.project_point(Vec3::new(f32::NAN, 0.5, f32::INFINITY));
        assert!(p.is_finite());
        assert!((p.x + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_palm_frame_core_and_axis() {
        let points = open_hand(Vec3::new(0.2, 0.1, 0.0));
        let frame = PalmFrame::from_landmarks(&points, &PalmFrame::default()).unwrap();

        let expected_core =
            (points[WRIST] + points[INDEX_MCP] + points[MIDDLE_MCP] + points[PINKY_MCP]) * 0.25;
        assert!(frame.core.distance(expected_core) < 1e-6);
        assert!((frame.axis.length() - 1.0).abs() < 1e-5);
        // Palm lies in XY, so the normal is along Z.
        assert!(frame.axis.z.abs() > 0.999);
    }

    #[test]
    fn test_palm_frame_degenerate_keeps_previous_axis() {
        let points = [Vec3::splat(0.3); LANDMARK_COUNT];
        let previous = PalmFrame {
            axis: Vec3::X,
            openness: 0.4,
            ..Default::default()
        };
        let frame = PalmFrame::from_landmarks(&points, &previous).unwrap();
        assert_eq!(frame.axis, Vec3::X);
        assert_eq!(frame.openness, 0.4);
        assert!(frame.core.is_finite());
    }

    #[test]
    fn test_palm_frame_requires_reference_landmarks() {
        let points = [Vec3::ONE; 10];
        assert!(PalmFrame::from_landmarks(&points, &PalmFrame::default()).is_none());
    }

    #[test]
    fn test_openness_fist_vs_open() {
        let open = open_hand(Vec3::ZERO);
        let open_frame = PalmFrame::from_landmarks(&open, &PalmFrame::default()).unwrap();

        let mut fist = open;
        for &tip in &FINGERTIPS {
            fist[tip] = fist[MIDDLE_MCP];
        }
        let fist_frame = PalmFrame::from_landmarks(&fist, &PalmFrame::default()).unwrap();

        assert!(open_frame.openness > fist_frame.openness);
        assert_eq!(fist_frame.openness, 0.0);
        assert!((0.0..=1.0).contains(&open_frame.openness));
    }

    #[test]
    fn test_bone_between_coincident_points() {
        let p = Vec3::new(0.1, 0.2, 0.3);
        let bone = BoneTransform::between(p, p);
        assert_eq!(bone.length, 0.0);
        assert_eq!(bone.rotation, Quat::IDENTITY);
        assert!(bone.midpoint.is_finite());
    }

    #[test]
    fn test_bone_rotation_aligns_y() {
        let bone = BoneTransform::between(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        assert!((bone.length - 2.0).abs() < 1e-6);
        assert!(bone.midpoint.distance(Vec3::new(1.0, 0.0, 0.0)) < 1e-6);
        assert!((bone.rotation * Vec3::Y).distance(Vec3::X) < 1e-5);

        // Antiparallel direction must not produce NaN.
        let down = BoneTransform::between(Vec3::ZERO, Vec3::NEG_Y);
        assert!(down.rotation.is_finite());
        assert!((down.rotation * Vec3::Y).distance(Vec3::NEG_Y) < 1e-5);
    }

    #[test]
    fn test_hand_bones_skip_missing_points() {
        let full = LandmarkSample::from_points(&open_hand(Vec3::ZERO), Handedness::Right);
        assert_eq!(hand_bones(&full).count(), HAND_SKELETON.len());

        let short = LandmarkSample::from_points(&open_hand(Vec3::ZERO)[..5], Handedness::Right);
        assert_eq!(hand_bones(&short).count(), 4);
    }

    #[test]
    fn test_collapsed_center_hand_index() {
        assert_eq!(collapsed_center_hand_index([false, false]), None);
        assert_eq!(collapsed_center_hand_index([true, true]), None);
        assert_eq!(collapsed_center_hand_index([true, false]), Some(0));
        assert_eq!(collapsed_center_hand_index([false, true]), Some(1));
    }
}
