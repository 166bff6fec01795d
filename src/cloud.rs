//! A hand's particle cloud and its fixed-step integrator.
//!
//! Particle state is stored as parallel arrays. Every temporary the physics
//! step needs (forces, spatial hash storage, trail history, output records)
//! is allocated when the cloud is built or explicitly reinitialized and then
//! reused; a step never allocates.

use crate::buffers::{ParticleVertex, RenderSnapshot};
use crate::color::{ColorCache, HslOffset};
use crate::field::{self, HandInput};
use crate::params::{NebulaParams, MAX_SPEED};
use crate::spatial::SpatialHash;
use crate::spawn::Spawner;
use crate::trails::{TrailHistory, MIN_TRAIL_LENGTH};
use glam::Vec3;

/// Semi-implicit Euler step with damping and a speed cap.
///
/// For each particle: `v += F·dt`, `v *= damping`, clamp `|v|` to
/// [`MAX_SPEED`], `x += v·dt`.
pub fn integrate(
    positions: &mut [Vec3],
    velocities: &mut [Vec3],
    forces: &[Vec3],
    damping: f32,
    dt: f32,
) {
    for ((x, v), &f) in positions.iter_mut().zip(velocities.iter_mut()).zip(forces) {
        let mut vel = (*v + f * dt) * damping;
        if !vel.is_finite() {
            vel = Vec3::ZERO;
        }
        *v = vel.clamp_length_max(MAX_SPEED);
        *x += *v * dt;
    }
}

/// Particle cloud bound to one hand slot.
#[derive(Debug, Clone)]
pub struct ParticleCloud {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    colors: Vec<Vec3>,
    size_factors: Vec<f32>,
    offsets: Vec<HslOffset>,
    /// Scratch: net force per particle for the current step.
    forces: Vec<Vec3>,
    hash: SpatialHash,
    trails: Option<TrailHistory>,
    colors_cache: ColorCache,
    vertices: Vec<ParticleVertex>,
    generation: u64,
}

impl ParticleCloud {
    /// Scatter `params.nebula_particle_count` particles in a sphere of
    /// `params.nebula_radius` around `center`, at rest.
    pub fn new(params: &NebulaParams, center: Vec3, spawner: &mut Spawner) -> Self {
        let mut cloud = Self {
            positions: Vec::new(),
            velocities: Vec::new(),
            colors: Vec::new(),
            size_factors: Vec::new(),
            offsets: Vec::new(),
            forces: Vec::new(),
            hash: SpatialHash::new(2.0 * params.separation_radius),
            trails: None,
            colors_cache: ColorCache::new(),
            vertices: Vec::new(),
            generation: 0,
        };
        cloud.reinitialize(params, center, spawner);
        cloud
    }

    /// Throw away all particles and scatter a fresh set.
    ///
    /// This is the only way the particle count changes. Colors, size factors
    /// and trail history are regenerated and the output generation is bumped.
    pub fn reinitialize(&mut self, params: &NebulaParams, center: Vec3, spawner: &mut Spawner) {
        let count = params.nebula_particle_count as usize;
        let radius = params.nebula_radius;

        self.positions = (0..count)
            .map(|_| center + spawner.random_in_sphere(radius))
            .collect();
        self.velocities = vec![Vec3::ZERO; count];
        self.colors = vec![Vec3::ZERO; count];
        self.offsets = (0..count).map(|_| spawner.color_offset()).collect();
        self.size_factors = (0..count).map(|_| spawner.size_factor()).collect();
        self.forces = vec![Vec3::ZERO; count];
        self.hash = SpatialHash::with_capacity(2.0 * params.separation_radius, count);
        self.vertices = vec![ParticleVertex::default(); count];
        self.colors_cache.invalidate();
        self.trails = params
            .trails_enabled
            .then(|| TrailHistory::new(params.trail_length as usize, &self.positions));
        self.generation += 1;
    }

    /// Allocate, reallocate or drop trail history to match `params`.
    ///
    /// Returns `true` if the trail buffers changed size.
    pub fn sync_trails(&mut self, params: &NebulaParams) -> bool {
        let length = params.trail_length as usize;
        let changed = if !params.trails_enabled {
            self.trails.take().is_some()
        } else if let Some(trails) = &mut self.trails {
            let resized = trails.length() != length.max(MIN_TRAIL_LENGTH);
            if resized {
                trails.reallocate(length, &self.positions);
            }
            resized
        } else {
            // Re-enabled: seed history at the current positions.
            self.trails = Some(TrailHistory::new(length, &self.positions));
            true
        };
        if changed {
            self.generation += 1;
        }
        changed
    }

    /// Advance one fixed sub-step.
    ///
    /// Rebuilds the spatial hash, evaluates the force field, integrates, and
    /// records trail history.
    pub fn step(&mut self, params: &NebulaParams, hand: &HandInput<'_>, time: f32, dt: f32) {
        self.hash.set_cell_size(2.0 * params.separation_radius);
        self.hash.rebuild(&self.positions);

        field::evaluate(params, hand, time, &self.positions, &self.hash, &mut self.forces);
        integrate(
            &mut self.positions,
            &mut self.velocities,
            &self.forces,
            params.damping,
            dt,
        );

        if let Some(trails) = &mut self.trails {
            trails.push(&self.positions);
        }
    }

    /// Bring colors and output records up to date. Call once per frame.
    ///
    /// Returns `true` if colors were recomputed.
    pub fn refresh_output(&mut self, params: &NebulaParams) -> bool {
        let recolored = self.colors_cache.update(
            params.hue,
            params.saturation,
            params.lightness,
            &self.offsets,
            &mut self.colors,
        );

        let base_size = params.nebula_particle_size;
        for (((out, p), c), s) in self
            .vertices
            .iter_mut()
            .zip(&self.positions)
            .zip(&self.colors)
            .zip(&self.size_factors)
        {
            *out = ParticleVertex {
                position: p.to_array(),
                color: c.to_array(),
                size: base_size * s,
            };
            debug_assert!(out.is_finite(), "non-finite particle reached the output buffer");
        }

        if let Some(trails) = &mut self.trails {
            trails.write_segments(params.trail_opacity);
        }
        recolored
    }

    /// Read-only view for a renderer.
    pub fn snapshot(&self) -> RenderSnapshot<'_> {
        RenderSnapshot {
            particles: &self.vertices,
            trail_positions: self.trails.as_ref().map(|t| t.segment_positions()),
            trail_alphas: self.trails.as_ref().map(|t| t.segment_alphas()),
            generation: self.generation,
        }
    }

    /// Index of the first particle with a non-finite position or velocity.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.positions
            .iter()
            .zip(&self.velocities)
            .position(|(p, v)| !p.is_finite() || !v.is_finite())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    #[inline]
    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    #[inline]
    pub fn offsets(&self) -> &[HslOffset] {
        &self.offsets
    }

    #[inline]
    pub fn trails(&self) -> Option<&TrailHistory> {
        self.trails.as_ref()
    }

    /// The spatial hash as of the last step.
    #[inline]
    pub fn spatial_hash(&self) -> &SpatialHash {
        &self.hash
    }

    /// Number of full color recomputes so far.
    #[inline]
    pub fn color_recomputes(&self) -> u64 {
        self.colors_cache.recompute_count()
    }

    /// Bumped whenever an output buffer changes length.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mutable access to velocities, for seeding test scenarios.
    pub fn velocities_mut(&mut self) -> &mut [Vec3] {
        &mut self.velocities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::PalmFrame;
    use crate::time::FIXED_DT;

    fn no_hand() -> HandInput<'static> {
        HandInput {
            landmarks: &[],
            velocities: &[],
            palm: None,
        }
    }

    #[test]
    fn test_integrate_damps_without_force() {
        let mut positions = vec![Vec3::ZERO; 4];
        let mut velocities = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -0.5, 0.2),
            Vec3::ZERO,
            Vec3::splat(0.8),
        ];
        let before: Vec<f32> = velocities.iter().map(|v| v.length()).collect();
        let forces = vec![Vec3::ZERO; 4];
        integrate(&mut positions, &mut velocities, &forces, 0.9, FIXED_DT);

        for (v, b) in velocities.iter().zip(before) {
            assert!(v.length() <= b);
        }
    }

    #[test]
    fn test_integrate_clamps_speed() {
        let mut positions = vec![Vec3::ZERO; 2];
        let mut velocities = vec![Vec3::ZERO; 2];
        let forces = vec![Vec3::new(1e4, 0.0, 0.0), Vec3::new(-3e3, 2e3, 1e3)];
        integrate(&mut positions, &mut velocities, &forces, 0.99, FIXED_DT);
        for v in &velocities {
            assert!(v.length() <= MAX_SPEED + 1e-5);
        }
        assert!(positions[0].x <= MAX_SPEED * FIXED_DT + 1e-6);
    }

    #[test]
    fn test_integrate_recovers_from_non_finite_force() {
        let mut positions = vec![Vec3::ZERO];
        let mut velocities = vec![Vec3::X];
        let forces = vec![Vec3::new(f32::NAN, 0.0, 0.0)];
        integrate(&mut positions, &mut velocities, &forces, 0.9, FIXED_DT);
        assert!(positions[0].is_finite());
        assert!(velocities[0].is_finite());
    }

    #[test]
    fn test_new_cloud_scatter() {
        let params = NebulaParams::default().with_particle_count(200).with_radius(0.5);
        let center = Vec3::new(1.0, -1.0, 0.5);
        let cloud = ParticleCloud::new(&params, center, &mut Spawner::from_seed(5));

        assert_eq!(cloud.len(), 200);
        assert!(cloud.positions().iter().all(|p| p.distance(center) <= 0.5 + 1e-4));
        assert!(cloud.velocities().iter().all(|v| *v == Vec3::ZERO));
        assert_eq!(cloud.snapshot().particles.len(), 200);
        assert!(cloud.trails().is_none());
    }

    #[test]
    fn test_reinitialize_changes_count_and_generation() {
        let params = NebulaParams::default().with_particle_count(100);
        let mut spawner = Spawner::from_seed(6);
        let mut cloud = ParticleCloud::new(&params, Vec3::ZERO, &mut spawner);
        let gen = cloud.generation();

        let bigger = params.clone().with_particle_count(300).with_trails(5);
        cloud.reinitialize(&bigger, Vec3::ZERO, &mut spawner);
        cloud.refresh_output(&bigger);

        assert_eq!(cloud.len(), 300);
        assert!(cloud.generation() > gen);
        let snap = cloud.snapshot();
        assert_eq!(snap.particles.len(), 300);
        assert_eq!(snap.trail_positions.map(|t| t.len()), Some(300 * 4 * 2 * 3));
    }

    #[test]
    fn test_sync_trails_transitions() {
        let params = NebulaParams::default().with_particle_count(60);
        let mut cloud = ParticleCloud::new(&params, Vec3::ZERO, &mut Spawner::from_seed(7));

        assert!(!cloud.sync_trails(&params));
        let with = params.clone().with_trails(8);
        assert!(cloud.sync_trails(&with));
        assert_eq!(cloud.trails().map(|t| t.length()), Some(8));
        assert!(!cloud.sync_trails(&with));

        let longer = with.clone().with_trails(20);
        assert!(cloud.sync_trails(&longer));
        assert_eq!(cloud.trails().map(|t| t.length()), Some(20));

        assert!(cloud.sync_trails(&params));
        assert!(cloud.trails().is_none());
    }

    #[test]
    fn test_step_without_forces_only_damps() {
        let params = NebulaParams::inert().with_particle_count(80);
        let mut cloud = ParticleCloud::new(&params, Vec3::ZERO, &mut Spawner::from_seed(8));
        for v in cloud.velocities_mut() {
            *v = Vec3::new(0.3, 0.1, -0.2);
        }
        let before: Vec<f32> = cloud.velocities().iter().map(|v| v.length()).collect();
        cloud.step(&params, &no_hand(), 0.0, FIXED_DT);
        for (v, b) in cloud.velocities().iter().zip(before) {
            assert!(v.length() <= b);
        }
    }

    #[test]
    fn test_step_rebuilds_hash_from_current_positions() {
        let params = NebulaParams::inert().with_particle_count(50);
        let mut cloud = ParticleCloud::new(&params, Vec3::ZERO, &mut Spawner::from_seed(9));
        cloud.step(&params, &no_hand(), 0.0, FIXED_DT);
        assert_eq!(cloud.spatial_hash().len(), 50);
        assert!((cloud.spatial_hash().cell_size() - 2.0 * params.separation_radius).abs() < 1e-6);
    }

    #[test]
    fn test_refresh_output_recolors_only_on_change() {
        let params = NebulaParams::default().with_particle_count(50);
        let mut cloud = ParticleCloud::new(&params, Vec3::ZERO, &mut Spawner::from_seed(10));

        assert!(cloud.refresh_output(&params));
        assert!(!cloud.refresh_output(&params));
        assert_eq!(cloud.color_recomputes(), 1);

        let recolored = params.clone().with_color(0.1, 0.8, 0.6);
        assert!(cloud.refresh_output(&recolored));
        assert_eq!(cloud.color_recomputes(), 2);
    }

    #[test]
    fn test_core_pull_contracts_cloud() {
        let params = NebulaParams {
            core_attraction: 1.2,
            ..NebulaParams::inert()
        }
        .with_particle_count(150)
        .with_radius(0.9);
        let mut cloud = ParticleCloud::new(&params, Vec3::ZERO, &mut Spawner::from_seed(11));
        let palm = PalmFrame::default();
        let hand = HandInput {
            landmarks: &[],
            velocities: &[],
            palm: Some(&palm),
        };

        let mean = |c: &ParticleCloud| {
            c.positions().iter().map(|p| p.length()).sum::<f32>() / c.len() as f32
        };
        let initial = mean(&cloud);
        for k in 0..120 {
            cloud.step(&params, &hand, k as f32 * FIXED_DT, FIXED_DT);
        }
        assert!(mean(&cloud) < initial);
        assert_eq!(cloud.first_non_finite(), None);
    }
}
