//! Particle coloring.
//!
//! Every particle gets a small fixed hue/saturation/lightness offset when it
//! is created, so the cloud shimmers around a single global color instead of
//! being flat. The global triple changes rarely (a slider, a preset), so
//! colors are only recomputed when it does.

use glam::Vec3;

/// Fixed per-particle color jitter, assigned once at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HslOffset {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

/// Convert HSL to RGB. Hue wraps; saturation and lightness are clamped to 0..1.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Vec3 {
    let h = hue.rem_euclid(1.0);
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = l - c * 0.5;

    let (r, g, b) = match (h * 6.0) as u32 % 6 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Vec3::new(r + m, g + m, b + m)
}

/// Recomputes particle colors only when the global HSL triple changes.
///
/// One dirty check covers the whole cloud; there is no per-particle state.
#[derive(Debug, Clone, Default)]
pub struct ColorCache {
    applied: Option<[f32; 3]>,
    recomputes: u64,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring `colors` up to date with the global triple.
    ///
    /// Returns `true` if colors were recomputed.
    pub fn update(
        &mut self,
        hue: f32,
        saturation: f32,
        lightness: f32,
        offsets: &[HslOffset],
        colors: &mut [Vec3],
    ) -> bool {
        let triple = [hue, saturation, lightness];
        if self.applied == Some(triple) {
            return false;
        }

        for (color, offset) in colors.iter_mut().zip(offsets) {
            *color = hsl_to_rgb(
                hue + offset.hue,
                saturation + offset.saturation,
                lightness + offset.lightness,
            );
        }

        self.applied = Some(triple);
        self.recomputes += 1;
        true
    }

    /// Force a recompute on the next update (e.g. after reallocation).
    pub fn invalidate(&mut self) {
        self.applied = None;
    }

    /// Number of full recomputes so far.
    #[inline]
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}
