//! Target field resolution.
//!
//! Each behavior has a layout: a pure mapping from `(index, seed, count)` to
//! a target position, run once for every particle when the slide changes.
//! Orbitals, the wave surface and the strange attractor additionally move
//! their targets every frame through [`evolve_targets`].

use std::f32::consts::TAU;

use glam::Vec3;

use crate::behavior::Behavior;
use crate::deck::Slide;
use crate::hash::IndexHasher;
use crate::state::ParticleState;
use crate::text::{Silhouette, TextSampler};

/// Half width of the text silhouette in world units.
pub const TEXT_HALF_WIDTH: f32 = 4.2;
/// Number of orbital rings.
pub const ORBITAL_RINGS: u32 = 7;

/// Lorenz parameters.
pub const LORENZ_SIGMA: f32 = 10.0;
pub const LORENZ_RHO: f32 = 28.0;
pub const LORENZ_BETA: f32 = 8.0 / 3.0;
/// Lorenz units to world units.
pub const LORENZ_SCALE: f32 = 0.1;
/// Lorenz time per second of simulation time.
const LORENZ_TIME_SCALE: f32 = 0.5;
const LORENZ_MAX_STEP: f32 = 0.004;
const LORENZ_MAX_SUBSTEPS: u32 = 8;
const LORENZ_WARMUP_DT: f32 = 0.005;

const CH_X: u32 = 0x7A46_0001;
const CH_Y: u32 = 0x7A46_0002;
const CH_Z: u32 = 0x7A46_0003;
const CH_RING: u32 = 0x7A46_0004;
const CH_RADIUS: u32 = 0x7A46_0005;

/// Inputs shared by every layout.
pub struct LayoutCtx<'a> {
    pub count: usize,
    pub hasher: IndexHasher,
    pub silhouette: Option<&'a Silhouette>,
}

/// `(ctx, index, seed) -> target`.
pub type LayoutFn = fn(&LayoutCtx<'_>, usize, f32) -> Vec3;

/// Layouts indexed by [`Behavior::index`].
pub const LAYOUTS: [LayoutFn; Behavior::COUNT] = [
    scatter_layout,
    text_layout,
    curl_layout,
    orbital_layout,
    wells_layout,
    lattice_layout,
    wave_layout,
    vortex_layout,
    burst_layout,
    flock_layout,
    attractor_layout,
    glitch_layout,
    singularity_layout,
];

/// Target of particle `i` under `behavior`'s static layout.
pub fn layout_target(behavior: Behavior, ctx: &LayoutCtx<'_>, i: usize, seed: f32) -> Vec3 {
    LAYOUTS[behavior.index()](ctx, i, seed)
}

fn cloud(ctx: &LayoutCtx<'_>, i: usize, extent: Vec3) -> Vec3 {
    let idx = i as u32;
    Vec3::new(
        ctx.hasher.signed(idx, CH_X),
        ctx.hasher.signed(idx, CH_Y),
        ctx.hasher.signed(idx, CH_Z),
    ) * extent
}

fn scatter_layout(ctx: &LayoutCtx<'_>, i: usize, _seed: f32) -> Vec3 {
    cloud(ctx, i, Vec3::new(4.0, 4.0, 1.0))
}

fn text_layout(ctx: &LayoutCtx<'_>, i: usize, seed: f32) -> Vec3 {
    match ctx.silhouette.and_then(|s| s.point_for_seed(seed).map(|p| (p, s.aspect))) {
        Some((p, aspect)) => {
            let depth = ctx.hasher.signed(i as u32, CH_Z) * 0.15;
            Vec3::new(
                p.x * TEXT_HALF_WIDTH,
                p.y * TEXT_HALF_WIDTH / aspect,
                depth,
            )
        }
        None => scatter_layout(ctx, i, seed),
    }
}

fn curl_layout(ctx: &LayoutCtx<'_>, i: usize, _seed: f32) -> Vec3 {
    cloud(ctx, i, Vec3::new(3.5, 2.5, 1.5))
}

/// Ring of particle `i`, `0..ORBITAL_RINGS`.
pub fn orbital_ring(hasher: &IndexHasher, i: usize) -> u32 {
    ((hasher.unit(i as u32, CH_RING) * ORBITAL_RINGS as f32) as u32).min(ORBITAL_RINGS - 1)
}

/// Point on particle `i`'s ring at time `t`. Outer rings turn faster.
pub fn orbital_target(hasher: &IndexHasher, i: usize, seed: f32, t: f32) -> Vec3 {
    let ring = orbital_ring(hasher, i) as f32;
    let radius = 0.8 + ring * 0.5 + hasher.signed(i as u32, CH_RADIUS) * 0.08;
    let speed = 0.2 + 0.14 * ring;
    let angle = seed * TAU + t * speed;
    let tilt = ring * 0.3;
    let (x, z) = (radius * angle.cos(), radius * angle.sin());
    Vec3::new(x, -z * tilt.sin(), z * tilt.cos())
}

fn orbital_layout(ctx: &LayoutCtx<'_>, i: usize, seed: f32) -> Vec3 {
    orbital_target(&ctx.hasher, i, seed, 0.0)
}

fn wells_layout(ctx: &LayoutCtx<'_>, i: usize, _seed: f32) -> Vec3 {
    cloud(ctx, i, Vec3::new(4.5, 3.0, 1.5))
}

fn lattice_layout(ctx: &LayoutCtx<'_>, i: usize, _seed: f32) -> Vec3 {
    let n = (ctx.count.max(1) as f32).cbrt().ceil().max(2.0) as usize;
    let cell = |k: usize| k as f32 / (n - 1) as f32 - 0.5;
    Vec3::new(
        cell(i % n) * 6.0,
        cell((i / n) % n) * 4.4,
        cell((i / (n * n)) % n) * 3.0,
    )
}

/// Columns and rows of the wave sheet (2:1 aspect).
pub fn wave_grid(count: usize) -> (usize, usize) {
    let cols = ((count.max(1) * 2) as f32).sqrt().ceil().max(2.0) as usize;
    let rows = count.div_ceil(cols).max(2);
    (cols, rows)
}

/// Height of the wave sheet: two traveling sines.
#[inline]
pub fn wave_height(x: f32, y: f32, t: f32) -> f32 {
    0.45 * (x * 1.2 + t * 1.4).sin() + 0.3 * (y * 1.7 - t * 1.1 + x * 0.4).sin()
}

fn wave_layout(ctx: &LayoutCtx<'_>, i: usize, _seed: f32) -> Vec3 {
    let (cols, rows) = wave_grid(ctx.count);
    let x = ((i % cols) as f32 / (cols - 1) as f32 - 0.5) * 8.0;
    let y = ((i / cols) as f32 / (rows - 1) as f32 - 0.5) * 4.0;
    Vec3::new(x, y, wave_height(x, y, 0.0))
}

fn vortex_layout(ctx: &LayoutCtx<'_>, i: usize, seed: f32) -> Vec3 {
    let angle = seed * TAU;
    let radius = 0.3 + ctx.hasher.unit(i as u32, CH_RADIUS) * 1.7;
    let y = (i as f32 + 0.5) / ctx.count.max(1) as f32 * 6.0 - 3.0;
    Vec3::new(radius * angle.cos(), y, radius * angle.sin())
}

fn burst_layout(ctx: &LayoutCtx<'_>, i: usize, _seed: f32) -> Vec3 {
    // Fibonacci sphere
    let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    let y = 1.0 - 2.0 * (i as f32 + 0.5) / ctx.count.max(1) as f32;
    let r = (1.0 - y * y).max(0.0).sqrt();
    let phi = i as f32 * golden;
    Vec3::new(r * phi.cos(), y, r * phi.sin()) * 2.4
}

fn flock_layout(ctx: &LayoutCtx<'_>, i: usize, _seed: f32) -> Vec3 {
    cloud(ctx, i, Vec3::new(3.5, 2.5, 1.5))
}

/// Starting Lorenz state for a seed, pre-integrated by a seed-dependent
/// number of steps so the swarm is spread along the manifold.
pub fn attractor_initial(seed: f32) -> Vec3 {
    let mut l = Vec3::new(1.0 + (seed - 0.5) * 2.0, 1.0 - (seed - 0.5), 20.0 + seed * 10.0);
    let warmup = 100 + (seed * 500.0) as usize;
    for _ in 0..warmup {
        l = lorenz_step(l, LORENZ_WARMUP_DT);
    }
    l
}

/// One explicit Euler step of the Lorenz system.
#[inline]
pub fn lorenz_step(l: Vec3, dt: f32) -> Vec3 {
    let d = Vec3::new(
        LORENZ_SIGMA * (l.y - l.x),
        l.x * (LORENZ_RHO - l.z) - l.y,
        l.x * l.y - LORENZ_BETA * l.z,
    );
    l + d * dt
}

/// Lorenz coordinates to view space (z up in Lorenz becomes y up on screen).
#[inline]
pub fn lorenz_to_world(l: Vec3) -> Vec3 {
    Vec3::new(l.x, l.z - 25.0, l.y) * LORENZ_SCALE
}

fn attractor_layout(_ctx: &LayoutCtx<'_>, _i: usize, seed: f32) -> Vec3 {
    lorenz_to_world(attractor_initial(seed))
}

/// Columns and rows of the glitch grid (16:9).
pub fn glitch_grid(count: usize) -> (usize, usize) {
    let cols = ((count.max(1) as f32) * 16.0 / 9.0).sqrt().ceil().max(2.0) as usize;
    let rows = count.div_ceil(cols).max(2);
    (cols, rows)
}

fn glitch_layout(ctx: &LayoutCtx<'_>, i: usize, _seed: f32) -> Vec3 {
    let (cols, rows) = glitch_grid(ctx.count);
    let x = ((i % cols) as f32 / (cols - 1) as f32 - 0.5) * 7.5;
    let y = ((i / cols) as f32 / (rows - 1) as f32 - 0.5) * 4.2;
    Vec3::new(x, y, 0.0)
}

fn singularity_layout(ctx: &LayoutCtx<'_>, i: usize, seed: f32) -> Vec3 {
    let angle = seed * TAU;
    let radius = 0.6 + ctx.hasher.unit(i as u32, CH_RADIUS).sqrt() * 3.9;
    let lift = ctx.hasher.signed(i as u32, CH_Y) * 0.15;
    Vec3::new(radius * angle.cos(), lift, radius * angle.sin())
}

/// Computes per-slide targets; owns the deck's text cache.
#[derive(Debug, Default)]
pub struct TargetResolver {
    text: TextSampler,
}

impl TargetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every target (and scratch state) for `slide`.
    pub fn resolve(&mut self, state: &mut ParticleState, slide: &Slide) {
        let behavior = slide.behavior;
        let count = state.len();

        let silhouette = if behavior == Behavior::Text {
            Some(self.text.sample(slide.text_word(), count))
        } else {
            None
        };

        if behavior.uses_attractor_state() {
            for i in 0..count {
                let l = attractor_initial(state.seeds[i]);
                state.attractor_x[i] = l.x;
                state.attractor_y[i] = l.y;
                state.attractor_z[i] = l.z;
                state.set_target(i, lorenz_to_world(l));
            }
        } else {
            state.clear_attractor();
            let ctx = LayoutCtx {
                count,
                hasher: state.hasher(),
                silhouette: silhouette.as_deref(),
            };
            for i in 0..count {
                let t = layout_target(behavior, &ctx, i, state.seeds[i]);
                state.set_target(i, t);
            }
        }
        log::debug!("resolved {} targets for {}", count, behavior);
    }

    pub fn text_sampler(&self) -> &TextSampler {
        &self.text
    }
}

/// Move targets for behaviors whose field evolves over time.
///
/// `t` is simulation time since the slide started; `dt` the clamped step.
pub fn evolve_targets(state: &mut ParticleState, behavior: Behavior, t: f32, dt: f32) {
    if !behavior.evolves_target() {
        return;
    }
    match behavior {
        Behavior::Orbitals => {
            let hasher = state.hasher();
            for i in 0..state.len() {
                let target = orbital_target(&hasher, i, state.seeds[i], t);
                state.set_target(i, target);
            }
        }
        Behavior::WaveSurface => {
            for chunk in state.targets.chunks_exact_mut(3) {
                chunk[2] = wave_height(chunk[0], chunk[1], t);
            }
        }
        Behavior::StrangeAttractor => {
            let total = (dt * LORENZ_TIME_SCALE).max(0.0);
            let substeps = ((total / LORENZ_MAX_STEP).ceil() as u32).clamp(1, LORENZ_MAX_SUBSTEPS);
            let h = total / substeps as f32;
            for i in 0..state.len() {
                let mut l = Vec3::new(state.attractor_x[i], state.attractor_y[i], state.attractor_z[i]);
                for _ in 0..substeps {
                    l = lorenz_step(l, h);
                }
                if !l.is_finite() {
                    l = attractor_initial(state.seeds[i]);
                }
                state.attractor_x[i] = l.x;
                state.attractor_y[i] = l.y;
                state.attractor_z[i] = l.z;
                state.set_target(i, lorenz_to_world(l));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Slide;

    fn ctx(count: usize) -> LayoutCtx<'static> {
        LayoutCtx {
            count,
            hasher: IndexHasher::default(),
            silhouette: None,
        }
    }

    #[test]
    fn test_layouts_are_pure_and_finite() {
        let c = ctx(500);
        for b in Behavior::ALL {
            for i in (0..500).step_by(37) {
                let seed = i as f32 / 500.0;
                let a = layout_target(b, &c, i, seed);
                assert!(a.is_finite(), "{} gave {:?}", b, a);
                assert_eq!(a, layout_target(b, &c, i, seed));
            }
        }
    }

    #[test]
    fn test_orbital_speed_increases_with_ring() {
        let hasher = IndexHasher::default();
        let mut inner = None;
        let mut outer = None;
        for i in 0..2000 {
            match orbital_ring(&hasher, i) {
                0 if inner.is_none() => inner = Some(i),
                r if r == ORBITAL_RINGS - 1 && outer.is_none() => outer = Some(i),
                _ => {}
            }
        }
        let angular = |i: usize| {
            let a = orbital_target(&hasher, i, 0.0, 0.0);
            let b = orbital_target(&hasher, i, 0.0, 0.1);
            a.angle_between(b)
        };
        assert!(angular(outer.unwrap()) > angular(inner.unwrap()));
    }

    #[test]
    fn test_lorenz_stays_bounded() {
        let mut l = attractor_initial(0.3);
        for _ in 0..10_000 {
            l = lorenz_step(l, 0.004);
        }
        assert!(l.x.abs() < 30.0 && l.y.abs() < 40.0 && l.z > -1.0 && l.z < 60.0);
    }

    #[test]
    fn test_text_targets_inside_silhouette_box() {
        let mut state = ParticleState::new(800, IndexHasher::default());
        let mut resolver = TargetResolver::new();
        resolver.resolve(&mut state, &Slide::new(Behavior::Text, "HI"));
        for i in 0..state.len() {
            let t = state.target(i);
            assert!(t.x.abs() <= TEXT_HALF_WIDTH + 1e-4);
            assert!(t.y.abs() <= TEXT_HALF_WIDTH / 3.0 + 1e-4);
        }
        assert_eq!(resolver.text_sampler().cached_words(), 1);
    }

    #[test]
    fn test_text_revisit_is_identical() {
        let mut state = ParticleState::new(600, IndexHasher::default());
        let mut resolver = TargetResolver::new();
        let slide = Slide::new(Behavior::Text, "AB");
        resolver.resolve(&mut state, &slide);
        let first = state.targets.clone();
        resolver.resolve(&mut state, &Slide::new(Behavior::Burst, "x"));
        resolver.resolve(&mut state, &slide);
        assert_eq!(first, state.targets);
    }

    #[test]
    fn test_attractor_scratch_cleared_when_leaving() {
        let mut state = ParticleState::new(50, IndexHasher::default());
        let mut resolver = TargetResolver::new();
        resolver.resolve(&mut state, &Slide::new(Behavior::StrangeAttractor, "L"));
        assert!(state.attractor_z.iter().any(|&z| z != 0.0));
        resolver.resolve(&mut state, &Slide::new(Behavior::Scatter, "S"));
        assert!(state.attractor_z.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn test_wave_targets_follow_height() {
        let mut state = ParticleState::new(200, IndexHasher::default());
        let mut resolver = TargetResolver::new();
        resolver.resolve(&mut state, &Slide::new(Behavior::WaveSurface, "W"));
        evolve_targets(&mut state, Behavior::WaveSurface, 2.0, 1.0 / 60.0);
        for i in 0..state.len() {
            let t = state.target(i);
            assert!((t.z - wave_height(t.x, t.y, 2.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_only_evolving_behaviors_move_targets() {
        let mut resolver = TargetResolver::new();
        for behavior in Behavior::ALL {
            let mut state = ParticleState::new(120, IndexHasher::default());
            resolver.resolve(&mut state, &Slide::new(behavior, "T"));
            let before = state.targets.clone();
            evolve_targets(&mut state, behavior, 1.5, 1.0 / 60.0);
            assert_eq!(
                state.targets != before,
                behavior.evolves_target(),
                "{:?}",
                behavior
            );
        }
    }
}
