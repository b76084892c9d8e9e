//! The engine handle.
//!
//! An [`Engine`] owns everything that lives for one deck at one quality
//! tier: the particle store, the resolver's text cache, the integrator's
//! scratch space, the constellation buffer, the performance monitor and the
//! playback controller. It has an explicit lifecycle:
//!
//! - [`Engine::create`] allocates for a tier and resolves slide 0.
//! - [`Engine::resize`] throws the store away and allocates a new one when
//!   the tier changes.
//! - [`Engine::destroy`] ends it.
//!
//! A frame is [`Engine::advance`] (sync slide and restart, evolve targets,
//! integrate, build the constellation), then the renderer reads the state,
//! then [`Engine::sample_performance`]. [`Engine::tick`] does both halves for
//! headless use.

use std::sync::Arc;

use crate::behavior::Behavior;
use crate::capability::{DeviceHints, QualityTier};
use crate::constellation::{overlay_enabled, Constellation};
use crate::deck::{Deck, Slide, VariantConfig};
use crate::error::DeckError;
use crate::fx::{resolve_fx, FxSettings};
use crate::hash::IndexHasher;
use crate::integrator::{clamp_dt, Integrator};
use crate::perf::{PerfMonitor, Transition};
use crate::playback::{DeckCommand, HostRequest, PlaybackController};
use crate::state::ParticleState;
use crate::targets::{evolve_targets, TargetResolver};

/// Velocity scale applied when the slide changes.
pub const HANDOFF_DAMPING: f32 = 0.35;

/// Knobs for building an engine.
///
/// ```ignore
/// let options = EngineOptions::new()
///     .with_reduced_motion(true)
///     .with_run_id(7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineOptions {
    /// Halve simulation speed and keep post-FX off.
    pub reduced_motion: bool,
    /// Use this tier instead of detecting one.
    pub tier: Option<QualityTier>,
    /// Salt for every per-index hash. Engines with equal run ids evolve
    /// identically.
    pub run_id: u32,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options derived from probed device hints.
    pub fn from_hints(hints: &DeviceHints) -> Self {
        Self {
            reduced_motion: hints.reduced_motion,
            ..Self::default()
        }
    }

    pub fn with_reduced_motion(mut self, reduced_motion: bool) -> Self {
        self.reduced_motion = reduced_motion;
        self
    }

    pub fn with_tier(mut self, tier: QualityTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_run_id(mut self, run_id: u32) -> Self {
        self.run_id = run_id;
        self
    }

    /// The forced tier, or one detected from `hints`.
    ///
    /// `reduced_motion` on the options counts as a device hint, so it pins
    /// detection to [`QualityTier::Low`] like the probed preference does.
    pub fn resolve_tier(&self, hints: &DeviceHints) -> QualityTier {
        let hints = DeviceHints {
            reduced_motion: hints.reduced_motion || self.reduced_motion,
            ..*hints
        };
        self.tier.unwrap_or_else(|| hints.tier())
    }
}

/// One running deck.
pub struct Engine {
    deck: Arc<Deck>,
    tier: QualityTier,
    options: EngineOptions,
    state: ParticleState,
    resolver: TargetResolver,
    integrator: Integrator,
    constellation: Constellation,
    perf: PerfMonitor,
    playback: PlaybackController,
    /// Slide whose targets are currently loaded.
    active_slide: usize,
    /// Restart counter value last acted on.
    seen_restart: u64,
    /// Simulation seconds since the active slide (or restart) began.
    slide_time: f32,
    /// Simulation seconds since creation.
    time: f32,
    fx: FxSettings,
    /// `(slide, degraded)` the current `fx` was resolved for.
    fx_key: (usize, bool),
    constellation_on: bool,
}

impl Engine {
    /// Allocate particle state for `tier` and resolve the first slide.
    ///
    /// Fails if the deck does not pass [`Deck::validate`].
    pub fn create(
        deck: Arc<Deck>,
        tier: QualityTier,
        options: EngineOptions,
    ) -> Result<Self, DeckError> {
        deck.validate()?;
        let count = tier.particle_count();
        log::info!(
            "creating engine: {} slides, variant {}, tier {} ({} particles)",
            deck.len(),
            deck.variant.name,
            tier,
            count
        );

        let playback = PlaybackController::new(deck.len());
        let mut engine = Self {
            state: ParticleState::new(count, IndexHasher::new(options.run_id)),
            resolver: TargetResolver::new(),
            integrator: Integrator::new(count as usize),
            constellation: Constellation::new(),
            perf: PerfMonitor::new(options.reduced_motion),
            playback,
            active_slide: 0,
            seen_restart: 0,
            slide_time: 0.0,
            time: 0.0,
            fx: FxSettings::default(),
            fx_key: (0, false),
            constellation_on: false,
            deck,
            tier,
            options,
        };
        engine.resolve_current();
        engine.refresh_fx(true);
        Ok(engine)
    }

    /// Reallocate for a new tier. Returns `false` if the tier is unchanged.
    ///
    /// Nothing from the old store survives: positions are re-scattered and the
    /// current slide's targets recomputed at the new count. The playback
    /// position and degradation state are kept.
    pub fn resize(&mut self, tier: QualityTier) -> bool {
        if tier == self.tier {
            return false;
        }
        let count = tier.particle_count();
        log::info!(
            "quality tier {} -> {}, reallocating {} particles",
            self.tier,
            tier,
            count
        );
        self.tier = tier;
        self.state = ParticleState::new(count, IndexHasher::new(self.options.run_id));
        self.state.scatter(self.playback.restart_counter());
        self.integrator = Integrator::new(count as usize);
        self.constellation = Constellation::new();
        self.slide_time = 0.0;
        self.resolve_current();
        self.refresh_fx(true);
        true
    }

    /// Tear the engine down.
    pub fn destroy(self) {
        log::info!(
            "destroying engine after {:.1}s ({} particles)",
            self.time,
            self.state.count()
        );
    }

    /// Route a navigation command to the playback controller.
    ///
    /// Slide and restart changes take effect at the start of the next
    /// [`advance`](Self::advance).
    pub fn handle(&mut self, command: DeckCommand) -> Option<HostRequest> {
        let request = self.playback.apply(command);
        if command == DeckCommand::ToggleHud {
            log::debug!("HUD {}", if self.playback.hud_visible() { "shown" } else { "hidden" });
        }
        request
    }

    /// Simulate one frame of `raw_dt` wall seconds.
    pub fn advance(&mut self, raw_dt: f32) {
        self.sync();

        let dt = clamp_dt(raw_dt, self.options.reduced_motion);
        self.time += dt;
        self.slide_time += dt;

        let behavior = self.current_slide().behavior;
        evolve_targets(&mut self.state, behavior, self.slide_time, dt);
        self.integrator.step(&mut self.state, behavior, self.slide_time, dt);

        self.constellation_on = overlay_enabled(
            &self.deck.variant.render,
            self.tier,
            self.options.reduced_motion,
            self.perf.degraded(),
        );
        if self.constellation_on {
            self.constellation.build(&self.state.positions);
        } else if self.constellation.segment_count() > 0 {
            self.constellation.clear();
        }
    }

    /// Feed the frame's wall time to the performance monitor.
    pub fn sample_performance(&mut self, raw_dt: f32) -> Option<Transition> {
        let transition = self.perf.record_frame(raw_dt);
        if transition.is_some() {
            self.refresh_fx(false);
        }
        transition
    }

    /// [`advance`](Self::advance) followed by
    /// [`sample_performance`](Self::sample_performance).
    pub fn tick(&mut self, raw_dt: f32) -> Option<Transition> {
        self.advance(raw_dt);
        self.sample_performance(raw_dt)
    }

    /// Act on slide or restart changes made since the last frame.
    fn sync(&mut self) {
        let index = self.playback.index();
        let restart = self.playback.restart_counter();

        if restart != self.seen_restart {
            self.seen_restart = restart;
            self.active_slide = index;
            self.state.scatter(restart);
            self.slide_time = 0.0;
            log::debug!("restart #{} on slide {}", restart, index);
            self.resolve_current();
        } else if index != self.active_slide {
            let previous = self.active_slide;
            self.active_slide = index;
            self.state.damp_velocities(HANDOFF_DAMPING);
            self.slide_time = 0.0;
            log::debug!("slide {} -> {}", previous, index);
            self.resolve_current();
        }

        self.refresh_fx(false);
    }

    fn resolve_current(&mut self) {
        let deck = Arc::clone(&self.deck);
        if let Some(slide) = deck.slide(self.active_slide) {
            self.resolver.resolve(&mut self.state, slide);
            if slide.behavior.uses_neighbors() {
                self.integrator.rebuild_neighbors(&self.state);
            }
        }
    }

    fn refresh_fx(&mut self, force: bool) {
        let key = (self.active_slide, self.perf.degraded());
        if !force && key == self.fx_key {
            return;
        }
        self.fx_key = key;
        let slide = self.current_slide();
        self.fx = resolve_fx(
            &slide.fx,
            &self.deck.variant.render,
            key.1,
            self.options.reduced_motion,
        );
        log::debug!(
            "fx for slide {}: trails {:?}, bloom {:?}",
            key.0,
            self.fx.trails,
            self.fx.bloom
        );
    }

    pub fn deck(&self) -> &Arc<Deck> {
        &self.deck
    }

    pub fn variant(&self) -> &VariantConfig {
        &self.deck.variant
    }

    /// Slide whose targets are loaded. Lags the playback index by one
    /// `advance` after navigation.
    pub fn current_slide(&self) -> &Slide {
        &self.deck.slides[self.active_slide]
    }

    pub fn behavior(&self) -> Behavior {
        self.current_slide().behavior
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn reduced_motion(&self) -> bool {
        self.options.reduced_motion
    }

    pub fn state(&self) -> &ParticleState {
        &self.state
    }

    /// Mutable particle access, for hosts that script positions directly.
    pub fn state_mut(&mut self) -> &mut ParticleState {
        &mut self.state
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn fx(&self) -> &FxSettings {
        &self.fx
    }

    pub fn degraded(&self) -> bool {
        self.perf.degraded()
    }

    pub fn perf(&self) -> &PerfMonitor {
        &self.perf
    }

    /// The constellation buffer, or `None` while the overlay is gated off.
    pub fn constellation(&self) -> Option<&Constellation> {
        self.constellation_on.then_some(&self.constellation)
    }

    /// Simulation seconds since creation.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Simulation seconds since the slide began.
    pub fn slide_time(&self) -> f32 {
        self.slide_time
    }

    /// HUD line: `title — subtitle (i/N)`, tier, and a degraded marker.
    pub fn status_line(&self) -> String {
        let slide = self.current_slide();
        let mut line = slide.title.clone();
        if !slide.subtitle.is_empty() {
            line.push_str(" \u{2014} ");
            line.push_str(&slide.subtitle);
        }
        line.push_str(&format!(
            " ({}/{}) [{}]",
            self.active_slide + 1,
            self.deck.len(),
            self.tier
        ));
        if self.degraded() {
            line.push_str(" [degraded]");
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Slide;

    fn deck() -> Arc<Deck> {
        Arc::new(
            Deck::new(
                vec![
                    Slide::new(Behavior::Scatter, "One").with_subtitle("first"),
                    Slide::new(Behavior::Burst, "Two"),
                    Slide::new(Behavior::Flock, "Three"),
                ],
                VariantConfig::aurora(),
            )
            .expect("valid deck"),
        )
    }

    #[test]
    fn test_navigation_applies_next_frame() {
        let mut engine = Engine::create(deck(), QualityTier::Low, EngineOptions::new()).expect("valid engine");
        engine.handle(DeckCommand::Next);
        assert_eq!(engine.behavior(), Behavior::Scatter);
        engine.advance(1.0 / 60.0);
        assert_eq!(engine.behavior(), Behavior::Burst);
        assert!(engine.slide_time() > 0.0 && engine.slide_time() < 0.02);
    }

    #[test]
    fn test_slide_change_damps_velocity() {
        let mut engine = Engine::create(deck(), QualityTier::Low, EngineOptions::new()).expect("valid engine");
        engine.state_mut().velocities.fill(1.0);
        engine.handle(DeckCommand::Next);
        engine.advance(0.0);
        // zero dt: only the hand-off damping applies
        assert!(engine.state().velocities.iter().all(|&v| (v - HANDOFF_DAMPING).abs() < 1e-6));
    }

    #[test]
    fn test_consecutive_restarts_both_apply() {
        let mut engine = Engine::create(deck(), QualityTier::Low, EngineOptions::new()).expect("valid engine");
        engine.handle(DeckCommand::Restart);
        engine.advance(0.0);
        let first = engine.state().positions.clone();
        engine.handle(DeckCommand::Restart);
        engine.advance(0.0);
        assert_ne!(first, engine.state().positions);
    }

    #[test]
    fn test_resize_same_tier_is_noop() {
        let mut engine = Engine::create(deck(), QualityTier::Medium, EngineOptions::new()).expect("valid engine");
        assert!(!engine.resize(QualityTier::Medium));
        assert!(engine.resize(QualityTier::High));
        assert_eq!(engine.state().count(), 3500);
    }

    #[test]
    fn test_status_line() {
        let mut engine = Engine::create(deck(), QualityTier::High, EngineOptions::new()).expect("valid engine");
        assert_eq!(engine.status_line(), "One \u{2014} first (1/3) [high]");
        engine.perf.observe_fps(10.0);
        assert!(engine.status_line().ends_with("[degraded]"));
    }

    #[test]
    fn test_degradation_refreshes_fx() {
        let mut engine = Engine::create(deck(), QualityTier::High, EngineOptions::new()).expect("valid engine");
        assert!(engine.fx().bloom_enabled());
        // two seconds at 20 fps
        for _ in 0..40 {
            engine.tick(0.05);
        }
        assert!(engine.degraded());
        assert!(!engine.fx().bloom_enabled());
        assert!(engine.constellation().is_none());
    }

    #[test]
    fn test_empty_deck_is_rejected() {
        let mut deck = (*deck()).clone();
        deck.slides.clear();
        let result = Engine::create(Arc::new(deck), QualityTier::Low, EngineOptions::new());
        assert!(matches!(result, Err(DeckError::Empty)));
    }

    #[test]
    fn test_bad_trails_damp_is_rejected() {
        let mut deck = (*deck()).clone();
        deck.slides[1].fx.trails_damp = 1.5;
        let result = Engine::create(Arc::new(deck), QualityTier::Low, EngineOptions::new());
        assert!(matches!(
            result,
            Err(DeckError::TrailsDampOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_options_reduced_motion_pins_low_tier() {
        let hints = DeviceHints {
            logical_cores: 16,
            pixel_ratio: 1.0,
            is_mobile: false,
            reduced_motion: false,
        };
        assert_eq!(EngineOptions::new().resolve_tier(&hints), QualityTier::Ultra);
        let reduced = EngineOptions::new().with_reduced_motion(true);
        assert_eq!(reduced.resolve_tier(&hints), QualityTier::Low);
        // an explicit tier still wins
        let forced = reduced.with_tier(QualityTier::High);
        assert_eq!(forced.resolve_tier(&hints), QualityTier::High);
    }

    #[test]
    fn test_exit_request() {
        let mut engine = Engine::create(deck(), QualityTier::Low, EngineOptions::new()).expect("valid engine");
        assert_eq!(engine.handle(DeckCommand::Exit), Some(HostRequest::Exit));
    }
}
