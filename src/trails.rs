//! Trail history for particle motion.
//!
//! Stores the last `length` positions of every particle, newest first, and
//! turns them into line segments for rendering. Each particle owns a
//! contiguous slice of the history buffer:
//!
//! ```text
//! particle 0: [p0(t), p0(t-1), ..., p0(t-L+1)]
//! particle 1: [p1(t), p1(t-1), ..., p1(t-L+1)]
//! ```
//!
//! A particle with history length `L` emits `L - 1` segments
//! `(history[i], history[i + 1])`. The segment buffer is flat `f32` xyz data,
//! two endpoints per segment, ready for a line-list vertex buffer.

use glam::Vec3;

/// Shortest trail that still forms a segment.
pub const MIN_TRAIL_LENGTH: usize = 2;

/// Per-particle position history and its segment output.
#[derive(Debug, Clone)]
pub struct TrailHistory {
    length: usize,
    particle_count: usize,
    history: Vec<Vec3>,
    /// Segment endpoints, xyz per vertex, two vertices per segment.
    segments: Vec<f32>,
    /// Alpha per segment vertex, fading toward the tail.
    alphas: Vec<f32>,
    alpha_opacity: Option<f32>,
}

impl TrailHistory {
    /// Allocate history for `positions.len()` particles, every slot seeded
    /// with the particle's current position.
    pub fn new(length: usize, positions: &[Vec3]) -> Self {
        let mut trails = Self {
            length: 0,
            particle_count: 0,
            history: Vec::new(),
            segments: Vec::new(),
            alphas: Vec::new(),
            alpha_opacity: None,
        };
        trails.reallocate(length, positions);
        trails
    }

    /// Reallocate for a new trail length (or particle count) and reseed.
    ///
    /// Seeding every slot with the current position keeps the first frame
    /// after a change from drawing one long streak.
    pub fn reallocate(&mut self, length: usize, positions: &[Vec3]) {
        let length = length.max(MIN_TRAIL_LENGTH);
        let count = positions.len();
        let segment_vertices = count * (length - 1) * 2;

        self.length = length;
        self.particle_count = count;
        self.history = vec![Vec3::ZERO; count * length];
        self.segments = vec![0.0; segment_vertices * 3];
        self.alphas = vec![0.0; segment_vertices];
        self.alpha_opacity = None;
        self.reseed(positions);
    }

    /// Collapse every trail onto the particle's current position.
    pub fn reseed(&mut self, positions: &[Vec3]) {
        let length = self.length;
        for (slots, &p) in self.history.chunks_exact_mut(length).zip(positions) {
            slots.fill(p);
        }
    }

    /// Record one physics step: shift every history back one slot and store
    /// the new position at slot 0.
    pub fn push(&mut self, positions: &[Vec3]) {
        let length = self.length;
        for (slots, &p) in self.history.chunks_exact_mut(length).zip(positions) {
            slots.copy_within(0..length - 1, 1);
            slots[0] = p;
        }
    }

    /// Rewrite the segment and alpha buffers from the current history.
    pub fn write_segments(&mut self, opacity: f32) {
        let length = self.length;
        let floats_per_particle = (length - 1) * 6;

        for (slots, out) in self
            .history
            .chunks_exact(length)
            .zip(self.segments.chunks_exact_mut(floats_per_particle))
        {
            for (i, pair) in slots.windows(2).enumerate() {
                let o = &mut out[i * 6..i * 6 + 6];
                o[..3].copy_from_slice(&pair[0].to_array());
                o[3..].copy_from_slice(&pair[1].to_array());
            }
        }

        if self.alpha_opacity != Some(opacity) {
            let tail = (length - 1) as f32;
            let vertices_per_particle = (length - 1) * 2;
            for out in self.alphas.chunks_exact_mut(vertices_per_particle) {
                for i in 0..length - 1 {
                    out[i * 2] = opacity * (1.0 - i as f32 / tail);
                    out[i * 2 + 1] = opacity * (1.0 - (i + 1) as f32 / tail);
                }
            }
            self.alpha_opacity = Some(opacity);
        }
    }

    /// History of one particle, newest first.
    pub fn history(&self, particle: usize) -> &[Vec3] {
        let start = particle * self.length;
        &self.history[start..start + self.length]
    }

    /// Flat segment endpoint positions (`particles × (length-1) × 2 × 3` floats).
    #[inline]
    pub fn segment_positions(&self) -> &[f32] {
        &self.segments
    }

    /// Alpha per segment vertex.
    #[inline]
    pub fn segment_alphas(&self) -> &[f32] {
        &self.alphas
    }

    /// Positions kept per particle.
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Total segments emitted.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.particle_count * (self.length - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(count: usize, x: f32) -> Vec<Vec3> {
        (0..count).map(|i| Vec3::new(x, i as f32, 0.0)).collect()
    }

    #[test]
    fn test_buffer_sizes() {
        for count in [1, 7, 50] {
            for length in [2, 3, 12, 40] {
                let mut trails = TrailHistory::new(length, &line(count, 0.0));
                trails.write_segments(1.0);
                assert_eq!(trails.segment_positions().len(), count * (length - 1) * 2 * 3);
                assert_eq!(trails.segment_alphas().len(), count * (length - 1) * 2);
                assert_eq!(trails.segment_count(), count * (length - 1));
            }
        }
    }

    #[test]
    fn test_length_below_minimum_is_raised() {
        let trails = TrailHistory::new(0, &line(3, 0.0));
        assert_eq!(trails.length(), MIN_TRAIL_LENGTH);
    }

    #[test]
    fn test_push_shifts_history_newest_first() {
        let mut trails = TrailHistory::new(4, &line(2, 0.0));
        trails.push(&line(2, 1.0));
        trails.push(&line(2, 2.0));

        let h = trails.history(1);
        assert_eq!(h[0], Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(h[1], Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(h[2], Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(h[3], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_segments_match_consecutive_history() {
        let count = 5;
        let length = 6;
        let mut trails = TrailHistory::new(length, &line(count, 0.0));
        for step in 1..10 {
            trails.push(&line(count, step as f32 * 0.1));
        }
        trails.write_segments(0.8);

        let segs = trails.segment_positions();
        for p in 0..count {
            let h = trails.history(p);
            for i in 0..length - 1 {
                let base = (p * (length - 1) + i) * 6;
                assert_eq!(Vec3::from_slice(&segs[base..base + 3]), h[i]);
                assert_eq!(Vec3::from_slice(&segs[base + 3..base + 6]), h[i + 1]);
            }
        }
    }

    #[test]
    fn test_reallocate_reseeds_to_current_position() {
        let mut trails = TrailHistory::new(3, &line(2, 0.0));
        trails.push(&line(2, 5.0));

        let now = line(2, 9.0);
        trails.reallocate(8, &now);
        assert_eq!(trails.length(), 8);
        for p in 0..2 {
            assert!(trails.history(p).iter().all(|&h| h == now[p]));
        }

        // No streak: every segment has zero length.
        trails.write_segments(1.0);
        for seg in trails.segment_positions().chunks_exact(6) {
            assert_eq!(seg[..3], seg[3..]);
        }
    }

    #[test]
    fn test_alpha_fades_to_zero_at_tail() {
        let mut trails = TrailHistory::new(5, &line(1, 0.0));
        trails.write_segments(0.5);
        let a = trails.segment_alphas();
        assert!((a[0] - 0.5).abs() < 1e-6);
        assert!(a.last().copied().unwrap_or(1.0).abs() < 1e-6);
        assert!(a.windows(2).all(|w| w[1] <= w[0] + 1e-6));

        trails.write_segments(1.0);
        assert!((trails.segment_alphas()[0] - 1.0).abs() < 1e-6);
    }
}
