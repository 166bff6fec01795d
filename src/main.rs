//! Headless demo: drives the nebula with a scripted hand and logs what the
//! simulation does.
//!
//! Run with `RUST_LOG=palm_nebula=debug,palm_nebula_demo=info` to see slot
//! transitions as well as the per-second summaries.

use palm_nebula::landmarks::{LANDMARK_COUNT, WRIST};
use palm_nebula::prelude::*;
use palm_nebula::Transition;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

const FRAMES: u32 = 900;
const NOMINAL_DELTA: f32 = 1.0 / 60.0;

fn main() {
    init_tracing();

    let params = NebulaParams::default()
        .with_particle_count(800)
        .with_arms(3, 0.35)
        .with_trails(16);
    let mut sim = NebulaSimulation::with_seed(params, 0x5EED_CAFE);
    let mut jitter = SmallRng::seed_from_u64(7);

    info!(frames = FRAMES, "Starting palm nebula demo");

    for frame in 0..FRAMES {
        let t = frame as f32 * NOMINAL_DELTA;
        let hands = scripted_hands(frame, t);

        // Uneven display timing, with an occasional stall.
        let mut delta = NOMINAL_DELTA * jitter.gen_range(0.6..1.6);
        if frame % 240 == 239 {
            delta = 0.25;
        }

        let report = sim.advance(delta, &hands);
        if report.transitions.iter().any(|t| *t != Transition::Unchanged) {
            info!(frame, transitions = ?report.transitions, "Hand slots changed");
        }

        if frame % 60 == 59 {
            log_summary(&sim, frame);
        }

        if frame == FRAMES / 2 {
            let recolored = sim.params().clone().with_color(0.08, 0.9, 0.55);
            sim.set_params(recolored);
            info!("Switched palette");
        }
    }

    match sim.check_finite() {
        Ok(()) => info!(
            frames = sim.clock().frames(),
            steps = sim.clock().steps(),
            simulated_secs = sim.clock().simulated_time(),
            dropped = sim.clock().dropped_steps(),
            "Demo finished"
        ),
        Err(e) => warn!(error = %e, "Demo finished with invalid particle state"),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Right hand opening and closing, drifting sideways, and dropping out of
/// tracking for a second every five seconds. A left hand joins halfway.
fn scripted_hands(frame: u32, t: f32) -> Vec<LandmarkSample> {
    let mut hands = Vec::with_capacity(2);

    if frame % 300 < 240 {
        let openness = 0.5 + 0.5 * (t * 1.3).sin();
        let center = [0.6 + 0.08 * (t * 0.4).sin(), 0.5];
        hands.push(synthetic_hand(center, openness, Handedness::Right));
    }
    if frame >= FRAMES / 2 {
        let openness = 0.5 + 0.5 * (t * 0.9).cos();
        hands.push(synthetic_hand([0.3, 0.55], openness, Handedness::Left));
    }
    hands
}

/// A flat hand in normalized tracker coordinates. `openness` 0 curls every
/// finger onto its knuckle, 1 stretches them out.
fn synthetic_hand(center: [f32; 2], openness: f32, handedness: Handedness) -> LandmarkSample {
    let [cx, cy] = center;
    let mut points = [[0.0f32; 3]; LANDMARK_COUNT];
    points[WRIST] = [cx, cy + 0.12, 0.0];

    let segment = 0.035 * openness.clamp(0.0, 1.0);
    for finger in 0..5 {
        let base = 1 + finger * 4;
        let x = cx + (finger as f32 - 2.0) * 0.03;
        let knuckle_y = cy + 0.02;
        for joint in 0..4 {
            let j = joint as f32;
            points[base + joint] = [x, knuckle_y - segment * j, -0.01 * j];
        }
    }

    LandmarkSample::new(&points, handedness)
}

fn log_summary(sim: &NebulaSimulation, frame: u32) {
    for slot in 0..HAND_SLOTS {
        let Some(cloud) = sim.cloud(slot) else {
            continue;
        };
        let palm = sim.hand(slot).and_then(|h| h.palm().copied());
        let core = palm.map_or(Vec3::ZERO, |p| p.core);
        let count = cloud.len().max(1) as f32;
        let mean_distance = cloud.positions().iter().map(|p| p.distance(core)).sum::<f32>() / count;
        let mean_speed = cloud.velocities().iter().map(|v| v.length()).sum::<f32>() / count;
        let snapshot = cloud.snapshot();

        info!(
            frame,
            slot,
            state = ?sim.slot_state(slot),
            openness = palm.map_or(0.0, |p| p.openness),
            mean_distance,
            mean_speed,
            trail_segments = snapshot.trail_segment_count(),
            "Nebula summary"
        );
    }
}
