//! Per-frame particle integration.
//!
//! Every tick runs two passes. The first fills a scratch buffer with the
//! active behavior's extra acceleration for every particle, reading the
//! previous frame's positions and velocities only. The second applies, per
//! particle and in this order: spring toward the target, exponential drag,
//! the behavior acceleration, the speed clamp, and position integration.
//!
//! Numeric trouble is handled here and nowhere else. Inverse-square terms are
//! padded with [`EPSILON`], and any particle that ends a step non-finite is
//! put back on its target at rest.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::behavior::Behavior;
use crate::hash::IndexHasher;
use crate::spatial::{SpatialConfig, SpatialHashGrid};
use crate::state::ParticleState;

/// Largest simulation step; slow frames are clamped to this.
pub const MAX_DT: f32 = 1.0 / 30.0;
/// Time scale applied under motion reduction.
pub const REDUCED_MOTION_SCALE: f32 = 0.5;
/// Padding for near-zero distances in inverse-square terms.
pub const EPSILON: f32 = 0.05;
/// Backstop bound on any position component.
pub const POSITION_LIMIT: f32 = 50.0;

/// Flocking radii and weights.
pub const FLOCK_NEIGHBOR_RADIUS: f32 = 0.5;
pub const FLOCK_SEPARATION_RADIUS: f32 = 0.25;
pub const FLOCK_SEPARATION: f32 = 1.25;
pub const FLOCK_ALIGNMENT: f32 = 0.35;
pub const FLOCK_COHESION: f32 = 0.25;
const FLOCK_CONTAINMENT_RADIUS: f32 = 4.0;

const GRAVITY_WELLS: [Vec3; 3] = [
    Vec3::new(-2.2, 0.6, 0.0),
    Vec3::new(2.0, 1.0, -0.5),
    Vec3::new(0.2, -1.6, 0.6),
];

const BURST_PERIOD: f32 = 4.0;
const GLITCH_RATE: f32 = 6.0;
const CH_GLITCH_GATE: u32 = 0x611C_0001;
const CH_GLITCH_X: u32 = 0x611C_0002;
const CH_GLITCH_Y: u32 = 0x611C_0003;

/// Simulation step for a raw frame delta.
///
/// `min(dt, MAX_DT)`, halved under motion reduction. Negative or non-finite
/// deltas become zero.
pub fn clamp_dt(raw_dt: f32, reduced_motion: bool) -> f32 {
    let dt = if raw_dt.is_finite() { raw_dt.clamp(0.0, MAX_DT) } else { 0.0 };
    if reduced_motion {
        dt * REDUCED_MOTION_SCALE
    } else {
        dt
    }
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// `strength / (|d|^2 + EPSILON)` along `d`.
#[inline]
fn inverse_square(d: Vec3, strength: f32) -> Vec3 {
    let dist_sq = d.length_squared() + EPSILON;
    d * (strength / (dist_sq * dist_sq.sqrt()))
}

/// Read-only view of the world handed to acceleration functions.
pub struct AccelCtx<'a> {
    /// Seconds since the slide started.
    pub t: f32,
    pub hasher: IndexHasher,
    pub positions: &'a [f32],
    pub velocities: &'a [f32],
    pub targets: &'a [f32],
    pub seeds: &'a [f32],
    pub grid: &'a SpatialHashGrid,
}

impl AccelCtx<'_> {
    #[inline]
    fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[i * 3..i * 3 + 3])
    }

    #[inline]
    fn velocity(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.velocities[i * 3..i * 3 + 3])
    }

    #[inline]
    fn target(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.targets[i * 3..i * 3 + 3])
    }
}

/// Extra acceleration for particle `i`.
pub type AccelFn = fn(&AccelCtx<'_>, usize) -> Vec3;

/// Behavior accelerations indexed by [`Behavior::index`]. `None` means the
/// spring alone drives the particle.
pub const ACCELERATIONS: [Option<AccelFn>; Behavior::COUNT] = [
    None,
    None,
    Some(curl_flow),
    None,
    Some(gravity_wells),
    Some(repulsion_lattice),
    None,
    Some(vortex_column),
    Some(burst),
    Some(flock),
    None,
    Some(glitch_grid),
    Some(singularity),
];

/// Divergence-free sinusoidal field: each component depends only on the
/// other two axes.
fn curl_flow(ctx: &AccelCtx<'_>, i: usize) -> Vec3 {
    let p = ctx.position(i);
    let t = ctx.t;
    Vec3::new(
        (p.y * 1.3 + t * 0.7).sin() + (p.z * 0.9 - t * 0.4).cos(),
        (p.z * 1.1 + t * 0.6).sin() + (p.x * 1.2 + t * 0.5).cos(),
        (p.x * 1.4 - t * 0.5).sin() + (p.y * 1.0 + t * 0.3).cos(),
    ) * 1.4
}

fn gravity_wells(ctx: &AccelCtx<'_>, i: usize) -> Vec3 {
    let p = ctx.position(i);
    let mut a = Vec3::ZERO;
    for well in GRAVITY_WELLS {
        a += inverse_square(well - p, 1.6);
    }
    // keep particles from collapsing onto their own target
    let away = p - ctx.target(i);
    let dist = away.length();
    if dist < 0.35 {
        a += away.normalize_or_zero() * (0.35 - dist) * 8.0;
    }
    a
}

/// Anchor `k` of the repulsion lattice at time `t`.
pub fn repulsion_anchor(k: usize, t: f32) -> Vec3 {
    let angle = t * 0.3 + k as f32 * TAU / 4.0;
    Vec3::new(2.2 * angle.cos(), 1.4 * (angle * 1.3).sin(), 1.0 * angle.sin())
}

fn repulsion_lattice(ctx: &AccelCtx<'_>, i: usize) -> Vec3 {
    let p = ctx.position(i);
    (0..4).fold(Vec3::ZERO, |a, k| a + inverse_square(p - repulsion_anchor(k, ctx.t), 0.9))
}

fn vortex_column(ctx: &AccelCtx<'_>, i: usize) -> Vec3 {
    let p = ctx.position(i);
    let radial = Vec3::new(p.x, 0.0, p.z);
    let r = radial.length();
    let tangent = Vec3::new(-p.z, 0.0, p.x).normalize_or_zero();
    let rise = 0.3 * (ctx.t + ctx.seeds[i] * TAU).sin();
    tangent * (2.2 / (1.0 + 0.3 * r)) - radial * 0.6 + Vec3::new(0.0, rise, 0.0)
}

/// Explosion gate in `[0, 1]`: a fast ramp up then a slower fall, once per
/// period. The seed skews each particle slightly.
pub fn burst_gate(t: f32, seed: f32) -> f32 {
    let phase = (t / BURST_PERIOD + seed * 0.05).fract();
    smoothstep(0.0, 0.08, phase) * (1.0 - smoothstep(0.08, 0.3, phase))
}

fn burst(ctx: &AccelCtx<'_>, i: usize) -> Vec3 {
    let p = ctx.position(i);
    let outward = if p.length_squared() > 1e-6 {
        p.normalize()
    } else {
        ctx.target(i).normalize_or_zero()
    };
    outward * burst_gate(ctx.t, ctx.seeds[i]) * 18.0
}

fn flock(ctx: &AccelCtx<'_>, i: usize) -> Vec3 {
    let p = ctx.position(i);
    let v = ctx.velocity(i);

    let mut separation = Vec3::ZERO;
    let mut velocity_sum = Vec3::ZERO;
    let mut position_sum = Vec3::ZERO;
    let mut neighbors = 0u32;

    ctx.grid
        .for_each_neighbor(ctx.positions, p, FLOCK_NEIGHBOR_RADIUS, |j, d, dist_sq| {
            if j == i {
                return;
            }
            neighbors += 1;
            velocity_sum += ctx.velocity(j);
            position_sum += p + d;
            if dist_sq < FLOCK_SEPARATION_RADIUS * FLOCK_SEPARATION_RADIUS {
                separation -= d / (dist_sq + 1e-3);
            }
        });

    let mut a = Vec3::ZERO;
    if neighbors > 0 {
        let n = neighbors as f32;
        a += separation * FLOCK_SEPARATION;
        a += (velocity_sum / n - v) * FLOCK_ALIGNMENT;
        a += (position_sum / n - p) * FLOCK_COHESION;
    }

    // gentle wander so an isolated boid still moves
    let seed = ctx.seeds[i];
    a += Vec3::new(
        (ctx.t * 0.7 + seed * TAU).sin(),
        (ctx.t * 0.5 + seed * 11.0).cos(),
        (ctx.t * 0.3 + seed * 5.0).sin() * 0.5,
    ) * 0.4;

    let r = p.length();
    if r > FLOCK_CONTAINMENT_RADIUS {
        a -= p / r * (r - FLOCK_CONTAINMENT_RADIUS) * 1.5;
    }
    a
}

fn glitch_grid(ctx: &AccelCtx<'_>, i: usize) -> Vec3 {
    let slot = (ctx.t * GLITCH_RATE).max(0.0) as u32;
    let idx = i as u32;
    let gate = smoothstep(0.93, 1.0, ctx.hasher.unit(idx, CH_GLITCH_GATE ^ slot));
    if gate == 0.0 {
        return Vec3::ZERO;
    }
    Vec3::new(
        ctx.hasher.signed(idx, CH_GLITCH_X ^ slot),
        ctx.hasher.signed(idx, CH_GLITCH_Y ^ slot) * 0.25,
        0.0,
    ) * gate
        * 14.0
}

fn singularity(ctx: &AccelCtx<'_>, i: usize) -> Vec3 {
    let p = ctx.position(i);
    let radial = Vec3::new(p.x, 0.0, p.z);
    let r = radial.length();
    let inward = -radial.normalize_or_zero() * (2.6 / (0.5 + r));
    let spin = Vec3::new(-p.z, 0.0, p.x).normalize_or_zero() * (3.0 / (0.4 + r));
    inward + spin + Vec3::new(0.0, -p.y * 1.4, 0.0)
}

/// Owns the integrator's scratch space: the acceleration buffer and the
/// flocking grid.
#[derive(Debug, Clone)]
pub struct Integrator {
    accel: Vec<f32>,
    grid: SpatialHashGrid,
}

impl Integrator {
    pub fn new(count: usize) -> Self {
        Self {
            accel: vec![0.0; count * 3],
            grid: SpatialHashGrid::new(SpatialConfig::default(), count),
        }
    }

    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    /// Re-bucket every particle from the current positions.
    pub fn rebuild_neighbors(&mut self, state: &ParticleState) {
        self.grid.rebuild(&state.positions);
    }

    /// Advance every particle by `dt` (already clamped by [`clamp_dt`]).
    ///
    /// `t` is seconds since the slide started. Flocking rebuilds the grid from
    /// the incoming positions before computing accelerations.
    pub fn step(&mut self, state: &mut ParticleState, behavior: Behavior, t: f32, dt: f32) {
        let count = state.len();
        if self.accel.len() != count * 3 {
            self.accel.resize(count * 3, 0.0);
        }

        match ACCELERATIONS[behavior.index()] {
            Some(accel_fn) => {
                if behavior.uses_neighbors() {
                    self.grid.rebuild(&state.positions);
                }
                let ctx = AccelCtx {
                    t,
                    hasher: state.hasher(),
                    positions: &state.positions,
                    velocities: &state.velocities,
                    targets: &state.targets,
                    seeds: &state.seeds,
                    grid: &self.grid,
                };
                for i in 0..count {
                    accel_fn(&ctx, i).write_to_slice(&mut self.accel[i * 3..i * 3 + 3]);
                }
            }
            None => self.accel.fill(0.0),
        }

        let dynamics = behavior.dynamics();
        let drag = (-dynamics.drag * dt).exp();
        let max_speed_sq = dynamics.max_speed * dynamics.max_speed;

        for i in 0..count {
            let mut p = state.position(i);
            let mut v = state.velocity(i);
            let target = state.target(i);
            let a = Vec3::from_slice(&self.accel[i * 3..i * 3 + 3]);

            v += (target - p) * dynamics.spring * dt;
            v *= drag;
            v += a * dt;

            let speed_sq = v.length_squared();
            if speed_sq > max_speed_sq {
                v *= dynamics.max_speed / speed_sq.sqrt();
            }

            p += v * dt;

            if !p.is_finite() || !v.is_finite() {
                p = if target.is_finite() { target } else { Vec3::ZERO };
                v = Vec3::ZERO;
            }
            p = p.clamp(Vec3::splat(-POSITION_LIMIT), Vec3::splat(POSITION_LIMIT));

            state.set_position(i, p);
            state.set_velocity(i, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at_targets(count: u32) -> ParticleState {
        let mut s = ParticleState::new(count, IndexHasher::default());
        s.targets.copy_from_slice(&s.positions);
        s
    }

    /// Evaluate `accel` for particle `i` with everything at rest.
    fn accel_at(accel: AccelFn, positions: &[f32], targets: &[f32], t: f32, i: usize) -> Vec3 {
        let count = positions.len() / 3;
        let grid = SpatialHashGrid::new(SpatialConfig::default(), count);
        let velocities = vec![0.0; positions.len()];
        let seeds = vec![0.5; count];
        let ctx = AccelCtx {
            t,
            hasher: IndexHasher::default(),
            positions,
            velocities: &velocities,
            targets,
            seeds: &seeds,
            grid: &grid,
        };
        accel(&ctx, i)
    }

    #[test]
    fn test_clamp_dt() {
        assert_eq!(clamp_dt(1.0, false), MAX_DT);
        assert_eq!(clamp_dt(1.0, true), MAX_DT * REDUCED_MOTION_SCALE);
        assert_eq!(clamp_dt(0.01, false), 0.01);
        assert_eq!(clamp_dt(-0.5, false), 0.0);
        assert_eq!(clamp_dt(f32::NAN, false), 0.0);
    }

    #[test]
    fn test_spring_pulls_toward_target() {
        let mut s = ParticleState::new(1, IndexHasher::default());
        s.set_position(0, Vec3::ZERO);
        s.set_target(0, Vec3::new(1.0, 0.0, 0.0));
        let mut integrator = Integrator::new(1);
        integrator.step(&mut s, Behavior::Scatter, 0.0, 1.0 / 60.0);
        assert!(s.velocity(0).x > 0.0);
        assert!(s.position(0).x > 0.0);
    }

    #[test]
    fn test_nan_particle_is_reset() {
        let mut s = state_at_targets(3);
        s.set_position(1, Vec3::new(f32::NAN, 0.0, 0.0));
        let target = s.target(1);
        let mut integrator = Integrator::new(3);
        integrator.step(&mut s, Behavior::GravityWells, 0.0, 1.0 / 60.0);
        assert_eq!(s.position(1), target);
        assert_eq!(s.velocity(1), Vec3::ZERO);
        assert!(s.position(0).is_finite());
    }

    #[test]
    fn test_positions_bounded() {
        let mut s = state_at_targets(1);
        s.set_position(0, Vec3::splat(1.0e6));
        s.set_target(0, Vec3::splat(1.0e6));
        let mut integrator = Integrator::new(1);
        integrator.step(&mut s, Behavior::Scatter, 0.0, MAX_DT);
        assert!(s.position(0).max_element() <= POSITION_LIMIT);
    }

    #[test]
    fn test_zero_distance_is_finite() {
        let mut s = state_at_targets(1);
        s.set_position(0, GRAVITY_WELLS[0]);
        let mut integrator = Integrator::new(1);
        integrator.step(&mut s, Behavior::GravityWells, 0.0, MAX_DT);
        assert!(s.velocity(0).is_finite());
    }

    #[test]
    fn test_curl_flow_is_divergence_free() {
        let grid = SpatialHashGrid::new(SpatialConfig::default(), 1);
        let h = 1e-3;
        let p = Vec3::new(0.3, -0.7, 0.2);
        let sample = |q: Vec3| {
            let positions = [q.x, q.y, q.z];
            let ctx = AccelCtx {
                t: 1.3,
                hasher: IndexHasher::default(),
                positions: &positions,
                velocities: &[0.0; 3],
                targets: &[0.0; 3],
                seeds: &[0.5],
                grid: &grid,
            };
            curl_flow(&ctx, 0)
        };
        let div = (sample(p + Vec3::X * h).x - sample(p - Vec3::X * h).x
            + sample(p + Vec3::Y * h).y
            - sample(p - Vec3::Y * h).y
            + sample(p + Vec3::Z * h).z
            - sample(p - Vec3::Z * h).z)
            / (2.0 * h);
        assert!(div.abs() < 1e-2, "divergence {}", div);
    }

    #[test]
    fn test_burst_gate_is_periodic() {
        assert!(burst_gate(0.32, 0.0) > 0.9);
        assert_eq!(burst_gate(2.0, 0.0), 0.0);
        assert!((burst_gate(0.2, 0.0) - burst_gate(0.2 + BURST_PERIOD, 0.0)).abs() < 1e-3);
    }

    #[test]
    fn test_vortex_spins_counterclockwise() {
        let mut s = state_at_targets(1);
        s.set_position(0, Vec3::new(1.0, 0.0, 0.0));
        s.set_target(0, Vec3::new(1.0, 0.0, 0.0));
        let mut integrator = Integrator::new(1);
        integrator.step(&mut s, Behavior::VortexColumn, 0.0, 1.0 / 60.0);
        assert!(s.velocity(0).z > 0.0);
    }

    #[test]
    fn test_gravity_wells_push_off_own_target() {
        let p = Vec3::new(0.4, 2.5, -0.3);
        let resting = accel_at(gravity_wells, &p.to_array(), &p.to_array(), 0.0, 0);
        let close = p - Vec3::new(0.1, 0.0, 0.0);
        let pushed = accel_at(gravity_wells, &p.to_array(), &close.to_array(), 0.0, 0);
        let push = pushed - resting;
        assert!((push.x - 2.0).abs() < 1e-4, "push {:?}", push);
        assert!(push.y.abs() < 1e-5 && push.z.abs() < 1e-5);
    }

    #[test]
    fn test_repulsion_lattice_pushes_away_from_anchor() {
        let anchor = repulsion_anchor(0, 0.0);
        let p = anchor + Vec3::new(0.1, 0.0, 0.0);
        let a = accel_at(repulsion_lattice, &p.to_array(), &[0.0; 3], 0.0, 0);
        assert!(a.dot(p - anchor) > 0.0, "accel {:?}", a);
    }

    #[test]
    fn test_singularity_pulls_inward_and_flattens() {
        let above = Vec3::new(1.0, 0.5, 0.0);
        let a = accel_at(singularity, &above.to_array(), &[0.0; 3], 0.0, 0);
        assert!(a.x < 0.0, "radial part points outward: {:?}", a);
        assert!(a.y < 0.0);

        let below = Vec3::new(0.0, -0.5, 1.0);
        let b = accel_at(singularity, &below.to_array(), &[0.0; 3], 0.0, 0);
        assert!(b.z < 0.0, "radial part points outward: {:?}", b);
        assert!(b.y > 0.0);
    }

    #[test]
    fn test_glitch_fires_for_few_particles() {
        let count = 400;
        let positions = vec![0.0; count * 3];
        let hasher = IndexHasher::default();
        for slot in 0..6u32 {
            let t = (slot as f32 + 0.5) / GLITCH_RATE;
            let mut fired = 0;
            for i in 0..count {
                let a = accel_at(glitch_grid, &positions, &positions, t, i);
                assert_eq!(a.z, 0.0);
                let gate = hasher.unit(i as u32, CH_GLITCH_GATE ^ slot);
                if gate <= 0.93 {
                    assert_eq!(a, Vec3::ZERO);
                } else if a != Vec3::ZERO {
                    fired += 1;
                    assert!(a.y.abs() <= 14.0 * 0.25 + 1e-4);
                }
            }
            assert!(fired > 0, "no glitch in slot {}", slot);
            assert!(fired < count / 4, "{} glitched in slot {}", fired, slot);
        }
    }
}
