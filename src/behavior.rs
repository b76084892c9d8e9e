//! Slide behaviors.
//!
//! A behavior is the force-field / target strategy a slide selects. The set
//! is closed; every behavior owns one row in [`DYNAMICS`], one layout in the
//! target resolver and (optionally) one acceleration term in the integrator.
//! All three tables are indexed by [`Behavior::index`].

use serde::{Deserialize, Serialize};

/// Force-field / target-generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Behavior {
    /// Loose static cloud.
    Scatter,
    /// Particles form the slide's word.
    Text,
    /// Divergence-free sinusoidal flow.
    CurlFlow,
    /// Per-particle rings rotating at ring-dependent speeds.
    Orbitals,
    /// Three fixed inverse-square attractors.
    GravityWells,
    /// 3-D lattice pushed around by slowly orbiting anchors.
    RepulsionLattice,
    /// Row/column sheet rippled by two traveling waves.
    WaveSurface,
    /// Rotating column around the vertical axis.
    VortexColumn,
    /// Periodic explosion from a spherical shell.
    Burst,
    /// Boids on the spatial hash grid.
    Flock,
    /// Lorenz system traced per particle.
    StrangeAttractor,
    /// Static grid with occasional jitter bursts.
    GlitchGrid,
    /// Inward spiral with vertical collapse.
    Singularity,
}

/// Spring/drag/speed constants for one behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dynamics {
    /// Spring constant toward the target.
    pub spring: f32,
    /// Exponential drag constant.
    pub drag: f32,
    /// Speed cap applied after all accelerations.
    pub max_speed: f32,
}

/// Per-behavior dynamics, indexed by [`Behavior::index`].
pub const DYNAMICS: [Dynamics; Behavior::COUNT] = [
    // scatter
    Dynamics { spring: 1.2, drag: 1.8, max_speed: 2.5 },
    // text
    Dynamics { spring: 3.2, drag: 3.0, max_speed: 4.0 },
    // curl-flow
    Dynamics { spring: 0.35, drag: 1.2, max_speed: 3.0 },
    // orbitals
    Dynamics { spring: 2.4, drag: 2.0, max_speed: 4.5 },
    // gravity-wells
    Dynamics { spring: 0.4, drag: 0.9, max_speed: 5.0 },
    // repulsion-lattice
    Dynamics { spring: 1.6, drag: 2.2, max_speed: 4.0 },
    // wave-surface
    Dynamics { spring: 2.8, drag: 2.6, max_speed: 3.5 },
    // vortex-column
    Dynamics { spring: 0.5, drag: 1.0, max_speed: 5.0 },
    // burst
    Dynamics { spring: 4.0, drag: 1.5, max_speed: 9.0 },
    // flock
    Dynamics { spring: 0.15, drag: 0.6, max_speed: 3.2 },
    // strange-attractor
    Dynamics { spring: 6.0, drag: 2.5, max_speed: 9.0 },
    // glitch-grid
    Dynamics { spring: 3.2, drag: 3.0, max_speed: 6.0 },
    // singularity
    Dynamics { spring: 4.5, drag: 1.1, max_speed: 8.0 },
];

impl Behavior {
    pub const COUNT: usize = 13;

    /// Every behavior in table order.
    pub const ALL: [Behavior; Behavior::COUNT] = [
        Behavior::Scatter,
        Behavior::Text,
        Behavior::CurlFlow,
        Behavior::Orbitals,
        Behavior::GravityWells,
        Behavior::RepulsionLattice,
        Behavior::WaveSurface,
        Behavior::VortexColumn,
        Behavior::Burst,
        Behavior::Flock,
        Behavior::StrangeAttractor,
        Behavior::GlitchGrid,
        Behavior::Singularity,
    ];

    /// Row in the behavior tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn dynamics(self) -> &'static Dynamics {
        &DYNAMICS[self.index()]
    }

    /// Needs the spatial hash grid each frame.
    pub fn uses_neighbors(self) -> bool {
        matches!(self, Behavior::Flock)
    }

    /// Keeps per-particle attractor scratch state.
    pub fn uses_attractor_state(self) -> bool {
        matches!(self, Behavior::StrangeAttractor)
    }

    /// Target is re-evaluated every frame rather than once per slide change.
    pub fn evolves_target(self) -> bool {
        matches!(
            self,
            Behavior::Orbitals | Behavior::WaveSurface | Behavior::StrangeAttractor
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Behavior::Scatter => "scatter",
            Behavior::Text => "text",
            Behavior::CurlFlow => "curl-flow",
            Behavior::Orbitals => "orbitals",
            Behavior::GravityWells => "gravity-wells",
            Behavior::RepulsionLattice => "repulsion-lattice",
            Behavior::WaveSurface => "wave-surface",
            Behavior::VortexColumn => "vortex-column",
            Behavior::Burst => "burst",
            Behavior::Flock => "flock",
            Behavior::StrangeAttractor => "strange-attractor",
            Behavior::GlitchGrid => "glitch-grid",
            Behavior::Singularity => "singularity",
        }
    }
}

impl std::fmt::Display for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_discriminants() {
        for (i, b) in Behavior::ALL.iter().enumerate() {
            assert_eq!(b.index(), i, "{} out of place", b);
        }
    }

    #[test]
    fn test_stiff_behaviors() {
        let ambient = Behavior::CurlFlow.dynamics();
        for b in [Behavior::Burst, Behavior::Singularity] {
            assert!(b.dynamics().spring > ambient.spring);
            assert!(b.dynamics().max_speed > ambient.max_speed);
        }
    }

    #[test]
    fn test_serde_names() {
        let b: Behavior = serde_json::from_str("\"strange-attractor\"").unwrap();
        assert_eq!(b, Behavior::StrangeAttractor);
        assert_eq!(serde_json::to_string(&Behavior::GlitchGrid).unwrap(), "\"glitch-grid\"");
        for b in Behavior::ALL {
            let json = format!("\"{}\"", b.name());
            assert_eq!(serde_json::from_str::<Behavior>(&json).unwrap(), b);
        }
    }
}
