//! Post-FX parameter resolution.
//!
//! The trail and bloom passes are configured by one pure function of the
//! slide preset, the variant's render style, the degradation flag and the
//! motion-reduction preference. The engine calls it again whenever any of
//! those four change.

use crate::deck::{FxPreset, RenderStyle};

/// Trail damps at or above this count as "never fades" and disable the pass.
pub const TRAILS_OFF_THRESHOLD: f32 = 0.995;
/// Trail damps at or below this keep nothing of the previous frame.
const TRAILS_MIN_DAMP: f32 = 0.01;
/// Bloom strengths below this are not worth a pass.
pub const MIN_BLOOM_STRENGTH: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSettings {
    /// Fraction of the previous frame kept.
    pub damp: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
}

/// Resolved pass parameters. `None` means the pass is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FxSettings {
    pub trails: Option<TrailSettings>,
    pub bloom: Option<BloomSettings>,
}

impl FxSettings {
    pub fn trails_enabled(&self) -> bool {
        self.trails.is_some()
    }

    pub fn bloom_enabled(&self) -> bool {
        self.bloom.is_some()
    }
}

/// Scale the slide preset by the variant and gate it on degradation and
/// motion reduction.
pub fn resolve_fx(
    preset: &FxPreset,
    style: &RenderStyle,
    degraded: bool,
    reduced_motion: bool,
) -> FxSettings {
    let throttled = degraded || reduced_motion;

    let damp = (preset.trails_damp * style.trails_scale).clamp(0.0, 1.0);
    let trails = (!throttled && damp > TRAILS_MIN_DAMP && damp < TRAILS_OFF_THRESHOLD)
        .then_some(TrailSettings { damp });

    let strength = preset.bloom_strength * style.bloom_scale;
    let bloom = (!throttled && strength.is_finite() && strength >= MIN_BLOOM_STRENGTH).then_some(
        BloomSettings {
            strength,
            radius: preset.bloom_radius.max(0.0),
            threshold: preset.bloom_threshold.clamp(0.0, 1.0),
        },
    );

    FxSettings { trails, bloom }
}
