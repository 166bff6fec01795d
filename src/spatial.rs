//! Uniform-grid spatial hash for particle neighbor queries.
//!
//! Particles are bucketed by integer cell coordinates. Rebuilding computes a
//! composite key per particle, sorts `(key, index)` pairs so each cell becomes
//! a contiguous run, and records the run for every occupied cell. A neighbor
//! query then walks the 3×3×3 block of cells around the particle's own cell.
//!
//! With a cell size of twice the search radius the stencil is exact: every
//! particle within the radius lies in one of the 27 cells.
//!
//! All storage is reused across rebuilds; after the first rebuild at a given
//! particle count no allocation happens.

use glam::{IVec3, Vec3};
use std::collections::HashMap;

/// Offsets of the 27 cells (including self) inspected by a query.
pub const NEIGHBOR_OFFSETS: [IVec3; 27] = {
    let mut out = [IVec3::ZERO; 27];
    let mut i = 0;
    while i < 27 {
        let (x, y, z) = (i % 3, (i / 3) % 3, i / 9);
        out[i] = IVec3::new(x as i32 - 1, y as i32 - 1, z as i32 - 1);
        i += 1;
    }
    out
};

const KEY_BITS: u32 = 21;
const KEY_MASK: u64 = (1 << KEY_BITS) - 1;
const KEY_BIAS: i64 = 1 << (KEY_BITS - 1);

/// Pack integer cell coordinates into a single key, 21 bits per axis.
///
/// Coordinates outside ±2^20 wrap. A wrapped key can only add candidates to a
/// query, never remove them, and candidates are distance-checked anyway.
#[inline]
pub fn cell_key(cell: IVec3) -> u64 {
    let pack = |c: i32| ((c as i64 + KEY_BIAS) as u64) & KEY_MASK;
    pack(cell.x) | (pack(cell.y) << KEY_BITS) | (pack(cell.z) << (2 * KEY_BITS))
}

/// Uniform-grid spatial hash over a set of positions.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    inv_cell_size: f32,
    /// Cell of every particle from the last rebuild.
    particle_cells: Vec<IVec3>,
    /// `(cell key, particle index)` sorted by key.
    sorted: Vec<(u64, u32)>,
    /// Cell key -> `start..end` run in `sorted`.
    cells: HashMap<u64, (u32, u32)>,
}

impl SpatialHash {
    /// Create an empty hash with the given cell size.
    pub fn new(cell_size: f32) -> Self {
        Self::with_capacity(cell_size, 0)
    }

    /// Create an empty hash with room for `capacity` particles.
    pub fn with_capacity(cell_size: f32, capacity: usize) -> Self {
        let cell_size = sanitize_cell_size(cell_size);
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            particle_cells: Vec::with_capacity(capacity),
            sorted: Vec::with_capacity(capacity),
            cells: HashMap::with_capacity(capacity),
        }
    }

    /// Cell size used for the next rebuild.
    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Change the cell size. Takes effect on the next rebuild.
    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.cell_size = sanitize_cell_size(cell_size);
        self.inv_cell_size = 1.0 / self.cell_size;
    }

    /// Number of particles indexed by the last rebuild.
    #[inline]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Number of occupied cells.
    #[inline]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Integer cell containing `position`.
    #[inline]
    pub fn cell_of(&self, position: Vec3) -> IVec3 {
        (position * self.inv_cell_size).floor().as_ivec3()
    }

    /// Re-index `positions`. Must be called whenever positions change.
    pub fn rebuild(&mut self, positions: &[Vec3]) {
        self.particle_cells.clear();
        self.sorted.clear();
        self.cells.clear();

        for (i, &p) in positions.iter().enumerate() {
            let cell = self.cell_of(p);
            self.particle_cells.push(cell);
            self.sorted.push((cell_key(cell), i as u32));
        }
        self.sorted.sort_unstable();

        let mut start = 0usize;
        while start < self.sorted.len() {
            let key = self.sorted[start].0;
            let mut end = start + 1;
            while end < self.sorted.len() && self.sorted[end].0 == key {
                end += 1;
            }
            self.cells.insert(key, (start as u32, end as u32));
            start = end;
        }
    }

    /// Visit every particle in the 27 cells around `particle`, itself included.
    pub fn for_each_candidate(&self, particle: usize, mut visit: impl FnMut(usize)) {
        let Some(&cell) = self.particle_cells.get(particle) else {
            return;
        };
        for offset in NEIGHBOR_OFFSETS {
            if let Some(&(start, end)) = self.cells.get(&cell_key(cell.wrapping_add(offset))) {
                for &(_, other) in &self.sorted[start as usize..end as usize] {
                    visit(other as usize);
                }
            }
        }
    }

    /// Visit every other particle strictly within `radius` of `particle`.
    ///
    /// The visitor receives the neighbor index, the offset from the neighbor
    /// to `particle`, and the squared distance. `positions` must be the slice
    /// the hash was last rebuilt from, and `radius` must not exceed the
    /// cell size for the result to be complete.
    pub fn for_each_neighbor(
        &self,
        positions: &[Vec3],
        particle: usize,
        radius: f32,
        mut visit: impl FnMut(usize, Vec3, f32),
    ) {
        let Some(&origin) = positions.get(particle) else {
            return;
        };
        let radius_sq = radius * radius;
        self.for_each_candidate(particle, |other| {
            if other == particle {
                return;
            }
            let offset = origin - positions[other];
            let dist_sq = offset.length_squared();
            if dist_sq < radius_sq {
                visit(other, offset, dist_sq);
            }
        });
    }
}

fn sanitize_cell_size(cell_size: f32) -> f32 {
    if cell_size.is_finite() && cell_size > 1e-4 {
        cell_size
    } else {
        1e-4
    }
}
