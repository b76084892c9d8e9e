//! Particle state store.
//!
//! Flat, contiguous per-particle arrays sized once from the particle count.
//! Vector fields are stored as `count * 3` floats (xyz xyz ...) so they can be
//! uploaded to the GPU without repacking.

use glam::Vec3;

use crate::hash::{hash01, IndexHasher, SEED_SALT, SIZE_SALT};

/// Half extents of the scatter box used on restart.
pub const SCATTER_EXTENT: Vec3 = Vec3::new(4.0, 4.0, 1.0);

const SCATTER_X: u32 = 0xA11C_E001;
const SCATTER_Y: u32 = 0xA11C_E002;
const SCATTER_Z: u32 = 0xA11C_E003;

/// All per-particle data for one deck.
#[derive(Debug, Clone)]
pub struct ParticleState {
    count: u32,
    hasher: IndexHasher,
    pub positions: Vec<f32>,
    pub velocities: Vec<f32>,
    pub targets: Vec<f32>,
    /// Static point-size multiplier, roughly `[0.6, 2.0]`.
    pub sizes: Vec<f32>,
    /// Static `[0, 1)` per-particle constant.
    pub seeds: Vec<f32>,
    /// Lorenz scratch state, only meaningful while the attractor runs.
    pub attractor_x: Vec<f32>,
    pub attractor_y: Vec<f32>,
    pub attractor_z: Vec<f32>,
}

impl ParticleState {
    /// Allocate a store for `count` particles.
    ///
    /// Seeds and sizes are a pure function of the index, so two stores with
    /// the same count are interchangeable.
    pub fn new(count: u32, hasher: IndexHasher) -> Self {
        let n = count as usize;
        let seeds: Vec<f32> = (0..count).map(|i| hash01(i, SEED_SALT)).collect();
        let sizes: Vec<f32> = (0..count)
            .map(|i| {
                let h = hash01(i, SIZE_SALT);
                0.6 + 1.4 * h * h
            })
            .collect();

        let mut state = Self {
            count,
            hasher,
            positions: vec![0.0; n * 3],
            velocities: vec![0.0; n * 3],
            targets: vec![0.0; n * 3],
            sizes,
            seeds,
            attractor_x: vec![0.0; n],
            attractor_y: vec![0.0; n],
            attractor_z: vec![0.0; n],
        };
        state.scatter(0);
        state
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn hasher(&self) -> IndexHasher {
        self.hasher
    }

    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[i * 3..i * 3 + 3])
    }

    #[inline]
    pub fn velocity(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.velocities[i * 3..i * 3 + 3])
    }

    #[inline]
    pub fn target(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.targets[i * 3..i * 3 + 3])
    }

    #[inline]
    pub fn set_position(&mut self, i: usize, p: Vec3) {
        p.write_to_slice(&mut self.positions[i * 3..i * 3 + 3]);
    }

    #[inline]
    pub fn set_velocity(&mut self, i: usize, v: Vec3) {
        v.write_to_slice(&mut self.velocities[i * 3..i * 3 + 3]);
    }

    #[inline]
    pub fn set_target(&mut self, i: usize, t: Vec3) {
        t.write_to_slice(&mut self.targets[i * 3..i * 3 + 3]);
    }

    /// Re-randomize positions into the scatter box and zero velocities.
    ///
    /// `generation` is the restart counter; each restart gets a different but
    /// reproducible scatter.
    pub fn scatter(&mut self, generation: u64) {
        let salt = (generation as u32) ^ ((generation >> 32) as u32).rotate_left(13);
        for i in 0..self.len() {
            let idx = i as u32;
            let p = Vec3::new(
                self.hasher.signed(idx, SCATTER_X ^ salt),
                self.hasher.signed(idx, SCATTER_Y ^ salt),
                self.hasher.signed(idx, SCATTER_Z ^ salt),
            ) * SCATTER_EXTENT;
            self.set_position(i, p);
        }
        self.velocities.fill(0.0);
    }

    /// Scale every velocity by `factor` (slide hand-off).
    pub fn damp_velocities(&mut self, factor: f32) {
        for v in &mut self.velocities {
            *v *= factor;
        }
    }

    /// Drop attractor scratch state.
    pub fn clear_attractor(&mut self) {
        self.attractor_x.fill(0.0);
        self.attractor_y.fill(0.0);
        self.attractor_z.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_shapes() {
        for count in [0, 1, 1200, 5000] {
            let s = ParticleState::new(count, IndexHasher::default());
            let n = count as usize;
            assert_eq!(s.positions.len(), n * 3);
            assert_eq!(s.velocities.len(), n * 3);
            assert_eq!(s.targets.len(), n * 3);
            assert_eq!(s.sizes.len(), n);
            assert_eq!(s.seeds.len(), n);
            assert_eq!(s.attractor_x.len(), n);
            assert_eq!(s.attractor_y.len(), n);
            assert_eq!(s.attractor_z.len(), n);
        }
    }

    #[test]
    fn test_seeds_and_sizes_deterministic() {
        let a = ParticleState::new(2500, IndexHasher::new(1));
        let b = ParticleState::new(2500, IndexHasher::new(99));
        assert_eq!(a.seeds, b.seeds);
        assert_eq!(a.sizes, b.sizes);
    }

    #[test]
    fn test_scatter_bounds_and_zero_velocity() {
        let mut s = ParticleState::new(1200, IndexHasher::default());
        s.velocities.fill(3.0);
        s.scatter(7);
        for i in 0..s.len() {
            let p = s.position(i);
            assert!(p.x.abs() <= 4.0 && p.y.abs() <= 4.0 && p.z.abs() <= 1.0);
        }
        assert!(s.velocities.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_scatter_differs_between_generations() {
        let mut s = ParticleState::new(64, IndexHasher::default());
        s.scatter(1);
        let first = s.positions.clone();
        s.scatter(2);
        assert_ne!(first, s.positions);
        s.scatter(1);
        assert_eq!(first, s.positions);
    }

    #[test]
    fn test_damp_velocities() {
        let mut s = ParticleState::new(4, IndexHasher::default());
        s.set_velocity(2, Vec3::new(2.0, -4.0, 1.0));
        s.damp_velocities(0.5);
        assert_eq!(s.velocity(2), Vec3::new(1.0, -2.0, 0.5));
    }
}
