//! Read-only output handed to a renderer.
//!
//! The simulation refreshes these buffers once per frame. A renderer borrows
//! them between frames and uploads them however it likes; the records are
//! plain `#[repr(C)]` data so they can go straight into a vertex buffer with
//! [`bytemuck::cast_slice`].
//!
//! Buffer lengths only change on an explicit reallocation (particle count or
//! trail length change, trails toggled). Each such change bumps
//! [`RenderSnapshot::generation`], which is the renderer's cue to recreate
//! GPU buffers.

use bytemuck::{Pod, Zeroable};

/// One particle as seen by the renderer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Linear RGB, 0..1.
    pub color: [f32; 3],
    /// Point size in world units.
    pub size: f32,
}

impl ParticleVertex {
    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(&self.color).all(|v| v.is_finite()) && self.size.is_finite()
    }
}

/// Everything a renderer needs to draw one particle cloud.
#[derive(Clone, Copy, Debug)]
pub struct RenderSnapshot<'a> {
    /// One record per particle.
    pub particles: &'a [ParticleVertex],
    /// Trail segment endpoints as flat xyz floats, when trails are enabled.
    pub trail_positions: Option<&'a [f32]>,
    /// Alpha per trail vertex, parallel to `trail_positions`.
    pub trail_alphas: Option<&'a [f32]>,
    /// Bumped whenever a buffer length changes.
    pub generation: u64,
}

impl<'a> RenderSnapshot<'a> {
    /// Particle records as raw bytes for upload.
    pub fn particle_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.particles)
    }

    /// Trail endpoints as raw bytes for upload.
    pub fn trail_bytes(&self) -> Option<&'a [u8]> {
        self.trail_positions.map(|p| bytemuck::cast_slice(p))
    }

    /// Number of trail line segments.
    pub fn trail_segment_count(&self) -> usize {
        self.trail_positions.map_or(0, |p| p.len() / 6)
    }
}
