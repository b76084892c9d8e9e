//! Nearest-neighbor constellation lines.
//!
//! Every [`STRIDE`]th particle is a sample. Each sample looks at the next
//! [`WINDOW`] samples and links to at most [`MAX_LINKS`] of the nearest ones
//! inside [`LINK_DISTANCE`]. Segments go into a fixed-size vertex buffer whose
//! unused tail is zeroed every build.

use glam::Vec3;

use crate::capability::QualityTier;
use crate::deck::RenderStyle;

pub const STRIDE: usize = 8;
pub const WINDOW: usize = 24;
pub const MAX_LINKS: usize = 2;
pub const MAX_SEGMENTS: usize = 1200;
pub const LINK_DISTANCE: f32 = 0.9;

/// Whether the overlay should run at all this frame.
pub fn overlay_enabled(
    style: &RenderStyle,
    tier: QualityTier,
    reduced_motion: bool,
    degraded: bool,
) -> bool {
    style.constellation && !reduced_motion && !degraded && tier != QualityTier::Low
}

/// Line vertex: xyz plus a fade that goes to zero at [`LINK_DISTANCE`].
pub type LineVertex = [f32; 4];

/// Capped line-segment buffer, two vertices per segment.
#[derive(Debug, Clone)]
pub struct Constellation {
    vertices: Vec<LineVertex>,
    segments: usize,
}

impl Default for Constellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Constellation {
    pub fn new() -> Self {
        Self {
            vertices: vec![[0.0; 4]; MAX_SEGMENTS * 2],
            segments: 0,
        }
    }

    /// Segments written by the last build.
    pub fn segment_count(&self) -> usize {
        self.segments
    }

    /// The whole buffer, including the zeroed tail.
    pub fn vertices(&self) -> &[LineVertex] {
        &self.vertices
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.vertices.fill([0.0; 4]);
        self.segments = 0;
    }

    /// Rebuild from a flat `xyz` position array. Returns the segment count.
    pub fn build(&mut self, positions: &[f32]) -> usize {
        let count = positions.len() / 3;
        let samples = count.div_ceil(STRIDE);
        let at = |k: usize| {
            let i = k * STRIDE;
            Vec3::from_slice(&positions[i * 3..i * 3 + 3])
        };
        let limit_sq = LINK_DISTANCE * LINK_DISTANCE;

        let mut written = 0;
        'outer: for a in 0..samples {
            let pa = at(a);
            // nearest two in the forward window, (dist_sq, sample)
            let mut best: [(f32, usize); MAX_LINKS] = [(f32::INFINITY, 0); MAX_LINKS];
            for b in (a + 1)..(a + 1 + WINDOW).min(samples) {
                let d = (at(b) - pa).length_squared();
                if d > limit_sq || !d.is_finite() {
                    continue;
                }
                if d < best[0].0 {
                    best[1] = best[0];
                    best[0] = (d, b);
                } else if d < best[1].0 {
                    best[1] = (d, b);
                }
            }
            for &(d, b) in &best {
                if !d.is_finite() {
                    continue;
                }
                if written == MAX_SEGMENTS {
                    break 'outer;
                }
                let fade = 1.0 - d.sqrt() / LINK_DISTANCE;
                let pb = at(b);
                self.vertices[written * 2] = [pa.x, pa.y, pa.z, fade];
                self.vertices[written * 2 + 1] = [pb.x, pb.y, pb.z, fade];
                written += 1;
            }
        }

        self.vertices[written * 2..].fill([0.0; 4]);
        self.segments = written;
        written
    }
}
