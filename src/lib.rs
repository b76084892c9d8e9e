//! # Choreo - particle choreography engine
//!
//! Slide-driven particle scenes rendered as glowing point sprites. Each slide
//! of a [`Deck`] names a [`Behavior`]; the engine moves every particle toward
//! a per-behavior target field with a damped spring, adds the behavior's
//! acceleration, and hands the result to a wgpu renderer with trails and
//! bloom.
//!
//! ## Quick Start
//!
//! ```ignore
//! use choreo::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let deck = Deck::showcase();
//!     if let DeckExit::Unavailable(err) = run_deck(deck, EngineOptions::new())? {
//!         eprintln!("no GPU: {err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Decks
//!
//! A [`Deck`] is an ordered list of [`Slide`]s plus a [`VariantConfig`] that
//! skins the render (overlay style, opacity, bloom and trail scale,
//! constellation lines). Decks load from JSON:
//!
//! ```ignore
//! let deck = Deck::from_path("decks/launch.json")?;
//! ```
//!
//! ### Behaviors
//!
//! | Behavior | Target field | Extra motion |
//! |----------|--------------|--------------|
//! | [`Behavior::Scatter`] | random cloud | - |
//! | [`Behavior::Text`] | glyph silhouette | - |
//! | [`Behavior::CurlFlow`] | cloud | curl field |
//! | [`Behavior::Orbitals`] | rotating rings | - |
//! | [`Behavior::GravityWells`] | cloud | three fixed wells |
//! | [`Behavior::RepulsionLattice`] | 3-D lattice | orbiting repulsors |
//! | [`Behavior::WaveSurface`] | rippling sheet | - |
//! | [`Behavior::VortexColumn`] | column | swirl and bob |
//! | [`Behavior::Burst`] | spherical shell | periodic impulse |
//! | [`Behavior::Flock`] | cloud | separation, alignment, cohesion |
//! | [`Behavior::StrangeAttractor`] | Lorenz trajectory | - |
//! | [`Behavior::GlitchGrid`] | flat grid | jitter bursts |
//! | [`Behavior::Singularity`] | disc | inward spiral |
//!
//! ### Frames
//!
//! [`Engine::advance`] runs one frame in a fixed order: apply pending slide
//! or restart changes, clamp `dt`, evolve targets, integrate, build the
//! constellation. The renderer then reads [`Engine::state`], and
//! [`Engine::sample_performance`] feeds the degradation controller.
//! Headless callers use [`Engine::tick`].
//!
//! ## Quality tiers
//!
//! [`QualityTier`] decides particle count, pixel-ratio ceiling and bloom
//! resolution. It is detected from [`DeviceHints`] and can be forced with
//! `CHOREO_TIER=low|medium|high|ultra`. `CHOREO_REDUCED_MOTION=1` halves
//! simulation speed and disables post effects.

pub mod behavior;
pub mod capability;
pub mod constellation;
pub mod deck;
pub mod engine;
pub mod error;
pub mod fx;
mod gpu;
pub mod hash;
pub mod input;
pub mod integrator;
pub mod perf;
pub mod playback;
pub mod shaders;
pub mod spatial;
pub mod state;
pub mod targets;
pub mod text;
pub mod time;
mod window;

pub use behavior::Behavior;
pub use capability::{DeviceHints, QualityTier};
pub use deck::{Deck, FxPreset, OverlayStyle, RenderStyle, Rgb, Slide, VariantConfig};
pub use engine::{Engine, EngineOptions};
pub use error::{DeckError, EngineError, GpuError};
pub use fx::FxSettings;
pub use glam::Vec3;
pub use perf::Transition;
pub use playback::{DeckCommand, HostRequest};
pub use state::ParticleState;
pub use window::{run_deck, DeckExit, FALLBACK_TITLE};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use choreo::prelude::*;
/// ```
pub mod prelude {
    pub use crate::behavior::Behavior;
    pub use crate::capability::{DeviceHints, QualityTier};
    pub use crate::deck::{Deck, FxPreset, Rgb, Slide, VariantConfig};
    pub use crate::engine::{Engine, EngineOptions};
    pub use crate::error::{DeckError, EngineError};
    pub use crate::playback::DeckCommand;
    pub use crate::time::FrameClock;
    pub use crate::window::{run_deck, DeckExit};
    pub use crate::Vec3;
}
