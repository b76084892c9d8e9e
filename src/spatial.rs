//! Spatial hash grid for neighbor queries.
//!
//! A fixed-resolution uniform grid over a bounded working volume, stored as
//! open-hash chains: one head index per cell plus one "next" link per
//! particle. Rebuilding is O(count); a query scans the particle's own cell and
//! the 26 cells around it.

use glam::{IVec3, Vec3};

/// Marks the end of a bucket chain.
pub const EMPTY: i32 = -1;

/// Configuration for the spatial hashing grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialConfig {
    /// Size of each cell in world units.
    pub cell_size: f32,
    /// Number of cells per dimension (grid is resolution^3).
    pub grid_resolution: u32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        // 32 cells of 0.5 cover [-8, 8] on each axis
        Self {
            cell_size: 0.5,
            grid_resolution: 32,
        }
    }
}

impl SpatialConfig {
    pub fn new(cell_size: f32, grid_resolution: u32) -> Self {
        assert!(cell_size > 0.0, "cell size must be positive");
        assert!(grid_resolution > 0, "grid resolution must be non-zero");
        Self {
            cell_size,
            grid_resolution,
        }
    }

    /// Total number of cells in the grid.
    pub fn total_cells(&self) -> u32 {
        self.grid_resolution * self.grid_resolution * self.grid_resolution
    }

    /// Half the edge length of the covered cube.
    pub fn half_extent(&self) -> f32 {
        self.grid_resolution as f32 * self.cell_size * 0.5
    }
}

/// Offsets of the 27 cells around (and including) a cell.
const NEIGHBOR_OFFSETS: [IVec3; 27] = {
    let mut out = [IVec3::ZERO; 27];
    let mut i = 0;
    while i < 27 {
        out[i] = IVec3::new((i % 3) as i32 - 1, ((i / 3) % 3) as i32 - 1, (i / 9) as i32 - 1);
        i += 1;
    }
    out
};

/// Bucketed particle indices for the current frame.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    config: SpatialConfig,
    cell_heads: Vec<i32>,
    cell_next: Vec<i32>,
}

impl SpatialHashGrid {
    pub fn new(config: SpatialConfig, count: usize) -> Self {
        Self {
            config,
            cell_heads: vec![EMPTY; config.total_cells() as usize],
            cell_next: vec![EMPTY; count],
        }
    }

    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    pub fn cell_heads(&self) -> &[i32] {
        &self.cell_heads
    }

    pub fn cell_next(&self) -> &[i32] {
        &self.cell_next
    }

    /// Integer cell coordinates of a world position, clamped into the grid.
    ///
    /// Positions outside the working volume land in the border cells rather
    /// than being dropped.
    #[inline]
    pub fn cell_coords(&self, p: Vec3) -> IVec3 {
        let max = self.config.grid_resolution as i32 - 1;
        let offset = (p + Vec3::splat(self.config.half_extent())) / self.config.cell_size;
        let offset = if offset.is_finite() { offset } else { Vec3::ZERO };
        offset.as_ivec3().clamp(IVec3::ZERO, IVec3::splat(max))
    }

    #[inline]
    fn cell_index(&self, c: IVec3) -> usize {
        let r = self.config.grid_resolution as usize;
        c.x as usize + c.y as usize * r + c.z as usize * r * r
    }

    /// Rebuild every chain from a flat `xyz` position array.
    pub fn rebuild(&mut self, positions: &[f32]) {
        let count = positions.len() / 3;
        self.cell_heads.fill(EMPTY);
        if self.cell_next.len() != count {
            self.cell_next.resize(count, EMPTY);
        }
        for i in 0..count {
            let p = Vec3::from_slice(&positions[i * 3..i * 3 + 3]);
            let cell = self.cell_index(self.cell_coords(p));
            self.cell_next[i] = self.cell_heads[cell];
            self.cell_heads[cell] = i as i32;
        }
    }

    /// Iterate the particle indices chained in one cell.
    pub fn chain(&self, cell: usize) -> ChainIter<'_> {
        ChainIter {
            next: &self.cell_next,
            cursor: self.cell_heads[cell],
        }
    }

    /// Call `visit(j, offset_from_p, dist_sq)` for every particle within
    /// `radius` of `p`, scanning the 27 surrounding cells.
    ///
    /// `radius` should not exceed the cell size or some neighbors are missed.
    pub fn for_each_neighbor<F>(&self, positions: &[f32], p: Vec3, radius: f32, mut visit: F)
    where
        F: FnMut(usize, Vec3, f32),
    {
        let radius_sq = radius * radius;
        let res = self.config.grid_resolution as i32;
        let center = self.cell_coords(p);
        for offset in NEIGHBOR_OFFSETS {
            let c = center + offset;
            if c.min_element() < 0 || c.max_element() >= res {
                continue;
            }
            for j in self.chain(self.cell_index(c)) {
                let q = Vec3::from_slice(&positions[j * 3..j * 3 + 3]);
                let d = q - p;
                let dist_sq = d.length_squared();
                if dist_sq <= radius_sq {
                    visit(j, d, dist_sq);
                }
            }
        }
    }
}

/// Walks one bucket chain.
pub struct ChainIter<'a> {
    next: &'a [i32],
    cursor: i32,
}

impl Iterator for ChainIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.cursor == EMPTY {
            return None;
        }
        let current = self.cursor as usize;
        self.cursor = self.next[current];
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_cover_cube() {
        assert!(NEIGHBOR_OFFSETS.contains(&IVec3::ZERO));
        assert!(NEIGHBOR_OFFSETS.contains(&IVec3::new(-1, -1, -1)));
        assert!(NEIGHBOR_OFFSETS.contains(&IVec3::new(1, 1, 1)));
        for (i, a) in NEIGHBOR_OFFSETS.iter().enumerate() {
            for b in &NEIGHBOR_OFFSETS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_out_of_volume_clamps() {
        let grid = SpatialHashGrid::new(SpatialConfig::default(), 0);
        assert_eq!(grid.cell_coords(Vec3::splat(1000.0)), IVec3::splat(31));
        assert_eq!(grid.cell_coords(Vec3::splat(-1000.0)), IVec3::ZERO);
        assert_eq!(grid.cell_coords(Vec3::splat(f32::NAN)), IVec3::ZERO);
    }

    #[test]
    fn test_query_finds_close_pair_only() {
        let positions = [0.0, 0.0, 0.0, 0.1, 0.0, 0.0, 3.0, 3.0, 3.0];
        let mut grid = SpatialHashGrid::new(SpatialConfig::default(), 3);
        grid.rebuild(&positions);
        let mut found = Vec::new();
        grid.for_each_neighbor(&positions, Vec3::ZERO, 0.5, |j, _, _| found.push(j));
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn test_query_crosses_cell_boundary() {
        // 0.0 is a cell boundary for the default grid
        let positions = [-0.05, 0.0, 0.0, 0.05, 0.0, 0.0];
        let mut grid = SpatialHashGrid::new(SpatialConfig::default(), 2);
        grid.rebuild(&positions);
        assert_ne!(
            grid.cell_coords(Vec3::new(-0.05, 0.0, 0.0)),
            grid.cell_coords(Vec3::new(0.05, 0.0, 0.0))
        );
        let mut hits = 0;
        grid.for_each_neighbor(&positions, Vec3::new(-0.05, 0.0, 0.0), 0.2, |_, _, _| hits += 1);
        assert_eq!(hits, 2);
    }
}
